use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// DTO for creating a category
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct NewCategory {
    #[validate(length(min = 1))]
    #[schema(example = "Work")]
    pub name: String,
}

impl From<NewCategory> for domain::category::NewCategory {
    fn from(value: NewCategory) -> Self {
        domain::category::NewCategory { name: value.name }
    }
}

/// DTO for changing a category. Omitted fields are left alone.
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct UpdateCategory {
    #[validate(length(min = 1))]
    #[schema(example = "Office")]
    pub name: Option<String>,
}

impl From<UpdateCategory> for domain::category::UpdateCategory {
    fn from(value: UpdateCategory) -> Self {
        domain::category::UpdateCategory { name: value.name }
    }
}

/// DTO for a category
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Work")]
    pub name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::category::Category> for Category {
    fn from(value: domain::category::Category) -> Self {
        Category {
            id: value.id,
            name: value.name,
            user_id: value.owner_user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for a category along with how many tasks are filed under it
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct CategoryWithCount {
    pub id: Uuid,
    #[schema(example = "Work")]
    pub name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(example = 3)]
    pub task_count: i64,
}

impl From<domain::category::CategoryWithCount> for CategoryWithCount {
    fn from(value: domain::category::CategoryWithCount) -> Self {
        let category = value.category;
        CategoryWithCount {
            id: category.id,
            name: category.name,
            user_id: category.owner_user_id,
            created_at: category.created_at,
            updated_at: category.updated_at,
            task_count: value.task_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_get_rejected() {
        let new_category = NewCategory {
            name: String::new(),
        };
        let update = UpdateCategory {
            name: Some(String::new()),
        };

        assert!(new_category.validate().is_err());
        assert!(update.validate().is_err());
    }

    #[test]
    fn omitted_name_is_a_valid_update() {
        let update = UpdateCategory { name: None };

        assert!(update.validate().is_ok());
    }
}
