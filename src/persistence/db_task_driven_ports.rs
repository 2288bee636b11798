use super::{Count, classify_write_error};
use crate::domain;
use crate::domain::DrivenPortError;
use crate::domain::category::Category;
use crate::domain::task::{
    CompletionFilter, NewTask, PageRequest, Task, TaskFilter, UpdateTask,
};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::query_as;
use uuid::Uuid;

const TASK_SELECT: &str = "SELECT t.id, t.title, t.details, t.deadline, t.is_starred, t.is_completed, \
     t.user_id, t.created_at, t.updated_at, \
     c.id AS category_id, c.name AS category_name, c.user_id AS category_user_id, \
     c.created_at AS category_created_at, c.updated_at AS category_updated_at \
     FROM tasks t LEFT JOIN categories c ON c.id = t.category_id";

/// Parameters $1 through $6 are bound by [bind_filter]
const FILTER_CLAUSE: &str = "WHERE t.user_id = $1 \
     AND ($2::UUID IS NULL OR t.category_id = $2) \
     AND ($3::TEXT IS NULL OR t.title ILIKE $3 ESCAPE '\\') \
     AND ($4::TIMESTAMPTZ IS NULL OR t.deadline >= $4) \
     AND ($5::TIMESTAMPTZ IS NULL OR t.deadline <= $5) \
     AND ($6::BOOLEAN IS NULL OR t.is_completed = $6)";

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    details: Option<String>,
    deadline: Option<DateTime<Utc>>,
    is_starred: bool,
    is_completed: bool,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    category_user_id: Option<Uuid>,
    category_created_at: Option<DateTime<Utc>>,
    category_updated_at: Option<DateTime<Utc>>,
}

impl From<TaskRow> for Task {
    fn from(value: TaskRow) -> Self {
        let category = match (
            value.category_id,
            value.category_name,
            value.category_user_id,
            value.category_created_at,
            value.category_updated_at,
        ) {
            (Some(id), Some(name), Some(owner_user_id), Some(created_at), Some(updated_at)) => {
                Some(Category {
                    id,
                    name,
                    owner_user_id,
                    created_at,
                    updated_at,
                })
            }
            _ => None,
        };

        Task {
            id: value.id,
            title: value.title,
            details: value.details,
            deadline: value.deadline,
            is_starred: value.is_starred,
            is_completed: value.is_completed,
            owner_user_id: value.user_id,
            category,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Turns search text into an ILIKE substring pattern, matching wildcard characters literally
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for character in search.chars() {
        if matches!(character, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(character);
    }
    pattern.push('%');

    pattern
}

fn completion_flag(completion: CompletionFilter) -> Option<bool> {
    match completion {
        CompletionFilter::Completed => Some(true),
        CompletionFilter::Incomplete => Some(false),
        CompletionFilter::All => None,
    }
}

fn bind_filter<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    user_id: Uuid,
    filter: &TaskFilter,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(user_id)
        .bind(filter.category_id)
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(filter.deadline_from)
        .bind(filter.deadline_to)
        .bind(completion_flag(filter.completion))
}

pub struct DbReadTasks;

impl domain::task::driven_ports::TaskReader for DbReadTasks {
    async fn tasks_matching(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        page: &PageRequest,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let query = format!(
            "{TASK_SELECT} {FILTER_CLAUSE} \
             ORDER BY t.is_starred DESC, t.created_at DESC, t.id \
             LIMIT $7 OFFSET $8"
        );
        let tasks = bind_filter(query_as::<_, TaskRow>(&query), user_id, filter)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(cxn_handle.borrow_connection())
            .await
            .context("fetching a page of tasks")?
            .into_iter()
            .map(Task::from)
            .collect();

        Ok(tasks)
    }

    async fn count_matching(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let query = format!("SELECT count(*) AS count FROM tasks t {FILTER_CLAUSE}");
        let matching = bind_filter(query_as::<_, Count>(&query), user_id, filter)
            .fetch_one(cxn_handle.borrow_connection())
            .await
            .context("counting matching tasks")?;

        Ok(matching.count())
    }

    async fn user_task_by_id(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let task = query_as::<_, TaskRow>(&format!(
            "{TASK_SELECT} WHERE t.id = $1 AND t.user_id = $2"
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("fetching a task by id")?;

        Ok(task.map(Task::from))
    }
}

#[derive(sqlx::FromRow)]
struct NewId {
    id: Uuid,
}

pub struct DbWriteTasks;

impl domain::task::driven_ports::TaskWriter for DbWriteTasks {
    async fn create_task_for_user(
        &self,
        user_id: Uuid,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Uuid, DrivenPortError> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let created = query_as::<_, NewId>(
            "INSERT INTO tasks (id, title, details, deadline, is_starred, category_id, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&new_task.title)
        .bind(new_task.details.as_deref())
        .bind(new_task.deadline)
        .bind(new_task.is_starred)
        .bind(new_task.category_id)
        .bind(user_id)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .map_err(|err| classify_write_error(err, "inserting a new task"))?;

        Ok(created.id)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &UpdateTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, DrivenPortError> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        // Nullable columns take a "change this" flag next to the new value so NULL can be written
        let updated = sqlx::query(
            "UPDATE tasks SET \
                 title = COALESCE($3, title), \
                 details = CASE WHEN $4::BOOLEAN THEN $5::TEXT ELSE details END, \
                 deadline = CASE WHEN $6::BOOLEAN THEN $7::TIMESTAMPTZ ELSE deadline END, \
                 is_starred = COALESCE($8, is_starred), \
                 is_completed = COALESCE($9, is_completed), \
                 category_id = CASE WHEN $10::BOOLEAN THEN $11::UUID ELSE category_id END, \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(task_id)
        .bind(user_id)
        .bind(update.title.as_deref())
        .bind(update.details.is_some())
        .bind(update.details.clone().flatten())
        .bind(update.deadline.is_some())
        .bind(update.deadline.flatten())
        .bind(update.is_starred)
        .bind(update.is_completed)
        .bind(update.category_id.is_some())
        .bind(update.category_id.flatten())
        .execute(cxn_handle.borrow_connection())
        .await
        .map_err(|err| classify_write_error(err, "updating a task"))?;

        Ok(updated.rows_affected() > 0)
    }

    async fn toggle_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let toggled = sqlx::query(
            "UPDATE tasks SET is_completed = NOT is_completed, updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(task_id)
        .bind(user_id)
        .execute(cxn_handle.borrow_connection())
        .await
        .context("toggling task completion")?;

        Ok(toggled.rows_affected() > 0)
    }

    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let deleted = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("deleting a task")?;

        Ok(deleted.rows_affected() > 0)
    }
}
