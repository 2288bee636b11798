use crate::domain;
use crate::domain::task::{CompletionFilter, PageRequest, TaskFilter, parse_deadline};
use crate::dto::category::Category;
use crate::dto::{field_error, nullable_field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

fn deadline_from_str(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationErrors> {
    parse_deadline(raw).map_err(|_| {
        field_error(
            field,
            "date",
            "must be an ISO-8601 date (YYYY-MM-DD) or date-time",
        )
    })
}

fn uuid_from_str(field: &'static str, raw: &str) -> Result<Uuid, ValidationErrors> {
    Uuid::parse_str(raw).map_err(|_| field_error(field, "uuid", "must be a UUID"))
}

/// DTO for creating a task
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize, Default))]
pub struct NewTask {
    #[validate(length(min = 1))]
    #[schema(example = "Write quarterly report")]
    pub title: String,
    #[schema(example = "Include the numbers from March")]
    pub details: Option<String>,
    /// ISO-8601 date or date-time
    #[schema(example = "2025-03-31T17:00:00Z")]
    pub deadline: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_starred: Option<bool>,
}

impl TryFrom<NewTask> for domain::task::NewTask {
    type Error = ValidationErrors;

    fn try_from(value: NewTask) -> Result<Self, Self::Error> {
        let deadline = value
            .deadline
            .as_deref()
            .map(|raw| deadline_from_str("deadline", raw))
            .transpose()?;

        Ok(domain::task::NewTask {
            title: value.title,
            details: value.details,
            deadline,
            is_starred: value.is_starred.unwrap_or(false),
            category_id: value.category_id,
        })
    }
}

/// DTO for changing a task. Omitted fields are left alone, and `null` clears `details`,
/// `deadline` or `categoryId`. An empty `categoryId` also clears the category.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize, Default))]
pub struct UpdateTask {
    #[validate(length(min = 1))]
    #[schema(example = "Write annual report")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable_field")]
    #[schema(value_type = Option<String>)]
    pub details: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable_field")]
    #[schema(value_type = Option<String>, example = "2025-12-31")]
    pub deadline: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable_field")]
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Option<String>>,
    pub is_starred: Option<bool>,
    pub is_completed: Option<bool>,
}

impl TryFrom<UpdateTask> for domain::task::UpdateTask {
    type Error = ValidationErrors;

    fn try_from(value: UpdateTask) -> Result<Self, Self::Error> {
        let deadline = match value.deadline {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => Some(Some(deadline_from_str("deadline", &raw)?)),
        };
        let category_id = match value.category_id {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(uuid_from_str("category_id", &raw)?)),
        };

        Ok(domain::task::UpdateTask {
            title: value.title,
            details: value.details,
            deadline,
            is_starred: value.is_starred,
            is_completed: value.is_completed,
            category_id,
        })
    }
}

/// Query string for listing tasks
#[derive(Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
#[cfg_attr(test, derive(Default))]
pub struct TaskQuery {
    /// Page to return, starting from 1
    #[validate(range(min = 1))]
    #[param(example = 1)]
    pub page: Option<u32>,
    /// Tasks per page
    #[validate(range(min = 1))]
    #[param(example = 10)]
    pub limit: Option<u32>,
    /// Only tasks in this category
    pub category_id: Option<String>,
    /// Case-insensitive text to look for in task titles
    pub search: Option<String>,
    /// Earliest deadline to include (ISO-8601)
    pub deadline_from: Option<String>,
    /// Latest deadline to include (ISO-8601)
    pub deadline_to: Option<String>,
    /// "true", "false" or "all"
    #[param(example = "all")]
    pub completed: Option<String>,
}

impl TaskQuery {
    /// Splits the query into the filter and page it asks for, parsing IDs and dates on the way
    pub fn into_filter_and_page(self) -> Result<(TaskFilter, PageRequest), ValidationErrors> {
        let non_empty = |field: Option<String>| field.filter(|text| !text.is_empty());

        let category_id = non_empty(self.category_id)
            .map(|raw| uuid_from_str("category_id", &raw))
            .transpose()?;
        let deadline_from = non_empty(self.deadline_from)
            .map(|raw| deadline_from_str("deadline_from", &raw))
            .transpose()?;
        let deadline_to = non_empty(self.deadline_to)
            .map(|raw| deadline_from_str("deadline_to", &raw))
            .transpose()?;
        let completion = match non_empty(self.completed) {
            None => CompletionFilter::All,
            Some(raw) => raw.parse().map_err(|_| {
                field_error(
                    "completed",
                    "completion_filter",
                    "must be \"true\", \"false\" or \"all\"",
                )
            })?,
        };

        let filter = TaskFilter {
            category_id,
            search: non_empty(self.search),
            deadline_from,
            deadline_to,
            completion,
        };
        let defaults = PageRequest::default();
        let page = PageRequest {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        };

        Ok((filter, page))
    }
}

/// DTO for a task
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct Task {
    pub id: Uuid,
    #[schema(example = "Write quarterly report")]
    pub title: String,
    pub details: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_starred: bool,
    pub is_completed: bool,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::task::Task> for Task {
    fn from(value: domain::task::Task) -> Self {
        Task {
            id: value.id,
            title: value.title,
            details: value.details,
            deadline: value.deadline,
            is_starred: value.is_starred,
            is_completed: value.is_completed,
            user_id: value.owner_user_id,
            category_id: value.category.as_ref().map(|category| category.id),
            category: value.category.map(Category::from),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO describing where a page sits in the full listing
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct PageMeta {
    #[schema(example = 15)]
    pub total: i64,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 2)]
    pub total_pages: i64,
}

/// DTO for one page of tasks
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub meta: PageMeta,
}

impl From<domain::task::TaskPage> for TaskPage {
    fn from(value: domain::task::TaskPage) -> Self {
        TaskPage {
            tasks: value.tasks.into_iter().map(Task::from).collect(),
            meta: PageMeta {
                total: value.meta.total,
                page: value.meta.page,
                limit: value.meta.limit,
                total_pages: value.meta.total_pages,
            },
        }
    }
}
