use crate::domain::category::driving_ports::CategoryError;
use crate::domain::{Acknowledgement, DrivenPortError};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category along with the number of tasks filed under it
#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct CategoryWithCount {
    pub category: Category,
    pub task_count: i64,
}

#[cfg_attr(test, derive(Clone, Debug))]
pub struct NewCategory {
    pub name: String,
}

/// Changes to a category. Fields left as [None] are not modified.
#[cfg_attr(test, derive(Clone, Debug))]
pub struct UpdateCategory {
    pub name: Option<String>,
}

pub mod driven_ports {
    use super::*;

    pub trait CategoryReader {
        /// Newest categories come first
        async fn categories_for_user(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<CategoryWithCount>, anyhow::Error>;
        async fn user_category_by_id(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<CategoryWithCount>, anyhow::Error>;
    }

    pub trait CategoryWriter {
        /// Fails with [DrivenPortError::Conflict] if the user already has a category with the name
        async fn create_category(
            &self,
            user_id: Uuid,
            new_category: &NewCategory,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Category, DrivenPortError>;
        /// Returns [None] if the user has no such category
        async fn update_category(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            update: &UpdateCategory,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Category>, DrivenPortError>;
        /// Returns whether a category was removed
        async fn delete_category(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }

    pub trait DetectCategory {
        async fn user_owns_category(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
        async fn user_category_name_taken(
            &self,
            user_id: Uuid,
            name: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum CategoryError {
        #[error("Category not found")]
        NotFound,
        #[error("Category with this name already exists")]
        NameTaken,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait CategoryPort {
        async fn create_category(
            &self,
            user_id: Uuid,
            new_category: &NewCategory,
            ext_cxn: &mut impl ExternalConnectivity,
            c_writer: &impl driven_ports::CategoryWriter,
            c_detect: &impl driven_ports::DetectCategory,
        ) -> Result<Category, CategoryError>;
        async fn categories_for_user(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            c_reader: &impl driven_ports::CategoryReader,
        ) -> Result<Vec<CategoryWithCount>, CategoryError>;
        async fn user_category_by_id(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            c_reader: &impl driven_ports::CategoryReader,
        ) -> Result<CategoryWithCount, CategoryError>;
        async fn update_category(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            update: &UpdateCategory,
            ext_cxn: &mut impl ExternalConnectivity,
            c_reader: &impl driven_ports::CategoryReader,
            c_writer: &impl driven_ports::CategoryWriter,
            c_detect: &impl driven_ports::DetectCategory,
        ) -> Result<Category, CategoryError>;
        async fn delete_category(
            &self,
            user_id: Uuid,
            category_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            c_writer: &impl driven_ports::CategoryWriter,
        ) -> Result<Acknowledgement, CategoryError>;
    }
}

#[derive(Debug, Error)]
pub enum CategoryAccessErr {
    #[error("category {0} does not exist or belongs to someone else")]
    NotOwned(Uuid),

    #[error(transparent)]
    PortError(#[from] anyhow::Error),
}

/// Makes sure a category can be attached to one of the user's tasks
pub async fn verify_category_owned(
    user_id: Uuid,
    category_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    c_detect: &impl driven_ports::DetectCategory,
) -> Result<(), CategoryAccessErr> {
    let owned = c_detect
        .user_owns_category(user_id, category_id, ext_cxn)
        .await?;

    if owned {
        Ok(())
    } else {
        Err(CategoryAccessErr::NotOwned(category_id))
    }
}

/// Converts a failed category write into the error reported to callers
fn category_write_error(port_err: DrivenPortError, action: &str) -> CategoryError {
    match port_err {
        DrivenPortError::Conflict => CategoryError::NameTaken,
        DrivenPortError::DoesNotExist => CategoryError::NotFound,
        DrivenPortError::CommsFailure(err) => CategoryError::PortError(err.context(action.to_owned())),
    }
}

pub struct CategoryService;

impl driving_ports::CategoryPort for CategoryService {
    async fn create_category(
        &self,
        user_id: Uuid,
        new_category: &NewCategory,
        ext_cxn: &mut impl ExternalConnectivity,
        c_writer: &impl driven_ports::CategoryWriter,
        c_detect: &impl driven_ports::DetectCategory,
    ) -> Result<Category, CategoryError> {
        let name_taken = c_detect
            .user_category_name_taken(user_id, &new_category.name, &mut *ext_cxn)
            .await
            .context("checking for duplicate category name")?;
        if name_taken {
            return Err(CategoryError::NameTaken);
        }

        let category = c_writer
            .create_category(user_id, new_category, &mut *ext_cxn)
            .await
            .map_err(|err| category_write_error(err, "creating a category"))?;
        info!(%user_id, category_id = %category.id, "created category");

        Ok(category)
    }

    async fn categories_for_user(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        c_reader: &impl driven_ports::CategoryReader,
    ) -> Result<Vec<CategoryWithCount>, CategoryError> {
        let categories = c_reader
            .categories_for_user(user_id, &mut *ext_cxn)
            .await
            .context("listing categories")?;

        Ok(categories)
    }

    async fn user_category_by_id(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        c_reader: &impl driven_ports::CategoryReader,
    ) -> Result<CategoryWithCount, CategoryError> {
        c_reader
            .user_category_by_id(user_id, category_id, &mut *ext_cxn)
            .await
            .context("fetching a category")?
            .ok_or(CategoryError::NotFound)
    }

    async fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        update: &UpdateCategory,
        ext_cxn: &mut impl ExternalConnectivity,
        c_reader: &impl driven_ports::CategoryReader,
        c_writer: &impl driven_ports::CategoryWriter,
        c_detect: &impl driven_ports::DetectCategory,
    ) -> Result<Category, CategoryError> {
        let existing = c_reader
            .user_category_by_id(user_id, category_id, &mut *ext_cxn)
            .await
            .context("fetching category before update")?
            .ok_or(CategoryError::NotFound)?;

        if let Some(new_name) = &update.name {
            if *new_name != existing.category.name {
                let name_taken = c_detect
                    .user_category_name_taken(user_id, new_name, &mut *ext_cxn)
                    .await
                    .context("checking for duplicate category name")?;
                if name_taken {
                    return Err(CategoryError::NameTaken);
                }
            }
        }

        c_writer
            .update_category(user_id, category_id, update, &mut *ext_cxn)
            .await
            .map_err(|err| category_write_error(err, "updating a category"))?
            .ok_or(CategoryError::NotFound)
    }

    async fn delete_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        c_writer: &impl driven_ports::CategoryWriter,
    ) -> Result<Acknowledgement, CategoryError> {
        let deleted = c_writer
            .delete_category(user_id, category_id, &mut *ext_cxn)
            .await
            .context("deleting a category")?;
        if !deleted {
            return Err(CategoryError::NotFound);
        }
        info!(%user_id, %category_id, "deleted category");

        Ok(Acknowledgement::new("Category deleted successfully"))
    }
}
