use crate::domain::category::{Category, CategoryAccessErr};
use crate::domain::category::driven_ports::DetectCategory;
use crate::domain::task::driving_ports::TaskError;
use crate::domain::{Acknowledgement, DrivenPortError, category};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub details: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_starred: bool,
    pub is_completed: bool,
    pub owner_user_id: Uuid,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task as submitted by its owner. New tasks are never completed.
#[derive(Default)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct NewTask {
    pub title: String,
    pub details: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_starred: bool,
    pub category_id: Option<Uuid>,
}

/// Changes to a task. The outer [Option] says whether a field is changing at all; for nullable
/// fields, an inner [None] clears the stored value.
#[derive(Default)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct UpdateTask {
    pub title: Option<String>,
    pub details: Option<Option<String>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub is_starred: Option<bool>,
    pub is_completed: Option<bool>,
    pub category_id: Option<Option<Uuid>>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum CompletionFilter {
    Completed,
    Incomplete,
    #[default]
    All,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("completed must be one of \"true\", \"false\" or \"all\"")]
pub struct InvalidCompletionFilter;

impl FromStr for CompletionFilter {
    type Err = InvalidCompletionFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(CompletionFilter::Completed),
            "false" => Ok(CompletionFilter::Incomplete),
            "all" => Ok(CompletionFilter::All),
            _ => Err(InvalidCompletionFilter),
        }
    }
}

/// Narrows down a task listing. Every criterion is optional and they combine with AND.
#[derive(PartialEq, Eq, Debug, Default, Clone)]
pub struct TaskFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub deadline_from: Option<DateTime<Utc>>,
    pub deadline_to: Option<DateTime<Utc>>,
    pub completion: CompletionFilter,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct PageRequest {
    /// 1-based
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Rows to skip before this page. Saturates for pages far beyond any real result set.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1).saturating_mul(i64::from(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: &PageRequest) -> PageMeta {
        let limit = i64::from(page.limit.max(1));
        PageMeta {
            total,
            page: page.page,
            limit: page.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub meta: PageMeta,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("\"{0}\" is not a valid date or date-time")]
pub struct InvalidDeadline(pub String);

/// Reads a deadline as an RFC 3339 timestamp, a date-time without an offset (taken as UTC),
/// or a bare date (taken as midnight UTC)
pub fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, InvalidDeadline> {
    let trimmed = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(InvalidDeadline(raw.to_owned()))
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader {
        /// One page of the user's tasks matching the filter, starred first then newest first
        async fn tasks_matching(
            &self,
            user_id: Uuid,
            filter: &TaskFilter,
            page: &PageRequest,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;
        /// How many of the user's tasks match the filter, ignoring pagination
        async fn count_matching(
            &self,
            user_id: Uuid,
            filter: &TaskFilter,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;
        async fn user_task_by_id(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, anyhow::Error>;
    }

    pub trait TaskWriter {
        /// Fails with [DrivenPortError::DoesNotExist] if the linked category is gone
        async fn create_task_for_user(
            &self,
            user_id: Uuid,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Uuid, DrivenPortError>;
        /// Returns whether the user had a task with the given ID
        async fn update_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            update: &UpdateTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, DrivenPortError>;
        /// Flips the completion flag in a single write. Returns whether the user had a task with the given ID.
        async fn toggle_completion(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
        /// Returns whether a task was removed
        async fn delete_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("Task not found")]
        NotFound,
        #[error("Category not found or does not belong to you")]
        CategoryNotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<CategoryAccessErr> for TaskError {
        fn from(value: CategoryAccessErr) -> Self {
            match value {
                CategoryAccessErr::NotOwned(_) => TaskError::CategoryNotFound,
                CategoryAccessErr::PortError(err) => TaskError::PortError(err),
            }
        }
    }


    pub trait TaskPort {
        async fn create_task(
            &self,
            user_id: Uuid,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
            t_reader: &impl driven_ports::TaskReader,
            t_writer: &impl driven_ports::TaskWriter,
            c_detect: &impl DetectCategory,
        ) -> Result<Task, TaskError>;
        async fn tasks_for_user(
            &self,
            user_id: Uuid,
            filter: &TaskFilter,
            page: &PageRequest,
            ext_cxn: &mut impl ExternalConnectivity,
            t_reader: &impl driven_ports::TaskReader,
        ) -> Result<TaskPage, TaskError>;
        /// Like [TaskPort::tasks_for_user], but only ever returns completed tasks
        async fn task_history(
            &self,
            user_id: Uuid,
            filter: &TaskFilter,
            page: &PageRequest,
            ext_cxn: &mut impl ExternalConnectivity,
            t_reader: &impl driven_ports::TaskReader,
        ) -> Result<TaskPage, TaskError>;
        async fn user_task_by_id(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            t_reader: &impl driven_ports::TaskReader,
        ) -> Result<Task, TaskError>;
        async fn update_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            update: &UpdateTask,
            ext_cxn: &mut impl ExternalConnectivity,
            t_reader: &impl driven_ports::TaskReader,
            t_writer: &impl driven_ports::TaskWriter,
            c_detect: &impl DetectCategory,
        ) -> Result<Task, TaskError>;
        async fn toggle_completion(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            t_reader: &impl driven_ports::TaskReader,
            t_writer: &impl driven_ports::TaskWriter,
        ) -> Result<Task, TaskError>;
        async fn delete_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            t_writer: &impl driven_ports::TaskWriter,
        ) -> Result<Acknowledgement, TaskError>;
    }
}

fn task_write_error(port_err: DrivenPortError, action: &str) -> TaskError {
    match port_err {
        DrivenPortError::DoesNotExist => TaskError::CategoryNotFound,
        DrivenPortError::Conflict => {
            TaskError::PortError(anyhow!("unexpected uniqueness conflict while {action}"))
        }
        DrivenPortError::CommsFailure(err) => TaskError::PortError(err.context(action.to_owned())),
    }
}

/// Re-reads a task after writing it so the caller gets the stored state and its category
async fn reload_task(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    t_reader: &impl driven_ports::TaskReader,
) -> Result<Task, TaskError> {
    t_reader
        .user_task_by_id(user_id, task_id, ext_cxn)
        .await
        .context("reloading task after write")?
        .ok_or(TaskError::NotFound)
}

pub struct TaskService;

impl TaskService {
    async fn page_of_tasks(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        page: &PageRequest,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
    ) -> Result<TaskPage, TaskError> {
        let total = t_reader
            .count_matching(user_id, filter, &mut *ext_cxn)
            .await
            .context("counting matching tasks")?;
        let tasks = t_reader
            .tasks_matching(user_id, filter, page, &mut *ext_cxn)
            .await
            .context("fetching page of tasks")?;

        Ok(TaskPage {
            tasks,
            meta: PageMeta::new(total, page),
        })
    }
}

impl driving_ports::TaskPort for TaskService {
    async fn create_task(
        &self,
        user_id: Uuid,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
        t_writer: &impl driven_ports::TaskWriter,
        c_detect: &impl DetectCategory,
    ) -> Result<Task, TaskError> {
        if let Some(category_id) = new_task.category_id {
            category::verify_category_owned(user_id, category_id, &mut *ext_cxn, c_detect).await?;
        }

        let task_id = t_writer
            .create_task_for_user(user_id, new_task, &mut *ext_cxn)
            .await
            .map_err(|err| task_write_error(err, "creating a task"))?;
        info!(%user_id, %task_id, "created task");

        reload_task(user_id, task_id, ext_cxn, t_reader).await
    }

    async fn tasks_for_user(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        page: &PageRequest,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
    ) -> Result<TaskPage, TaskError> {
        self.page_of_tasks(user_id, filter, page, ext_cxn, t_reader)
            .await
    }

    async fn task_history(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        page: &PageRequest,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
    ) -> Result<TaskPage, TaskError> {
        let completed_only = TaskFilter {
            completion: CompletionFilter::Completed,
            ..filter.clone()
        };

        self.page_of_tasks(user_id, &completed_only, page, ext_cxn, t_reader)
            .await
    }

    async fn user_task_by_id(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
    ) -> Result<Task, TaskError> {
        t_reader
            .user_task_by_id(user_id, task_id, ext_cxn)
            .await
            .context("fetching a task")?
            .ok_or(TaskError::NotFound)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &UpdateTask,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
        t_writer: &impl driven_ports::TaskWriter,
        c_detect: &impl DetectCategory,
    ) -> Result<Task, TaskError> {
        let existing = t_reader
            .user_task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("fetching task before update")?
            .ok_or(TaskError::NotFound)?;

        if let Some(Some(new_category_id)) = update.category_id {
            let current_category_id = existing.category.as_ref().map(|category| category.id);
            if current_category_id != Some(new_category_id) {
                category::verify_category_owned(user_id, new_category_id, &mut *ext_cxn, c_detect)
                    .await?;
            }
        }

        let updated = t_writer
            .update_task(user_id, task_id, update, &mut *ext_cxn)
            .await
            .map_err(|err| task_write_error(err, "updating a task"))?;
        if !updated {
            return Err(TaskError::NotFound);
        }

        reload_task(user_id, task_id, ext_cxn, t_reader).await
    }

    async fn toggle_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        t_reader: &impl driven_ports::TaskReader,
        t_writer: &impl driven_ports::TaskWriter,
    ) -> Result<Task, TaskError> {
        let toggled = t_writer
            .toggle_completion(user_id, task_id, &mut *ext_cxn)
            .await
            .context("toggling task completion")?;
        if !toggled {
            return Err(TaskError::NotFound);
        }

        reload_task(user_id, task_id, ext_cxn, t_reader).await
    }

    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        t_writer: &impl driven_ports::TaskWriter,
    ) -> Result<Acknowledgement, TaskError> {
        let deleted = t_writer
            .delete_task(user_id, task_id, ext_cxn)
            .await
            .context("deleting a task")?;
        if !deleted {
            return Err(TaskError::NotFound);
        }
        info!(%user_id, %task_id, "deleted task");

        Ok(Acknowledgement::new("Task deleted successfully"))
    }
}
