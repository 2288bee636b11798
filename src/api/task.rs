use crate::api::session::CurrentUser;
use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, Json, Path, Query, Success};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::routing::{get, patch};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(
    create_task,
    tasks_for_user,
    task_history,
    task_by_id,
    update_task,
    toggle_completion,
    delete_task
))]
/// Defines the OpenAPI documentation for the task API
pub struct TasksApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

/// Builds a router for all the task routes
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Query(query): Query<dto::task::TaskQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    tasks_for_user(user_id, query, &mut ext_cxn, &domain::task::TaskService).await
                },
            )
            .post(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Json(new_task): Json<dto::task::NewTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    create_task(user_id, new_task, &mut ext_cxn, &domain::task::TaskService).await
                },
            ),
        )
        .route(
            "/history",
            get(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Query(query): Query<dto::task::TaskQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    task_history(user_id, query, &mut ext_cxn, &domain::task::TaskService).await
                },
            ),
        )
        .route(
            "/:task_id",
            get(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(task_id): Path<Uuid>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    task_by_id(user_id, task_id, &mut ext_cxn, &domain::task::TaskService).await
                },
            )
            .patch(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(task_id): Path<Uuid>,
                 Json(update): Json<dto::task::UpdateTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    update_task(
                        user_id,
                        task_id,
                        update,
                        &mut ext_cxn,
                        &domain::task::TaskService,
                    )
                    .await
                },
            )
            .delete(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(task_id): Path<Uuid>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    delete_task(user_id, task_id, &mut ext_cxn, &domain::task::TaskService).await
                },
            ),
        )
        .route(
            "/:task_id/toggle-complete",
            patch(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(task_id): Path<Uuid>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    toggle_completion(user_id, task_id, &mut ext_cxn, &domain::task::TaskService)
                        .await
                },
            ),
        )
}

impl From<TaskError> for ApiError {
    fn from(value: TaskError) -> Self {
        match value {
            TaskError::NotFound | TaskError::CategoryNotFound => {
                ApiError::not_found(value.to_string())
            }
            TaskError::PortError(cause) => ApiError::internal(cause),
        }
    }
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    request_body = dto::task::NewTask,
    responses(
        (status = 201, description = "Task created, wrapped in the success envelope", body = dto::task::Task),
        (status = 400, description = "Invalid task data", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Category not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Creates a task for the signed-in user
async fn create_task(
    user_id: Uuid,
    new_task: dto::task::NewTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::task::Task>, ApiError> {
    info!(%user_id, "Creating task");
    new_task.validate()?;

    let new_task = domain::task::NewTask::try_from(new_task)?;
    let task_reader = persistence::db_task_driven_ports::DbReadTasks;
    let task_writer = persistence::db_task_driven_ports::DbWriteTasks;
    let category_detector = persistence::db_category_driven_ports::DbDetectCategory;
    let created_task = task_service
        .create_task(
            user_id,
            &new_task,
            ext_cxn,
            &task_reader,
            &task_writer,
            &category_detector,
        )
        .await?;

    Ok(Success::created(created_task.into()))
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    params(dto::task::TaskQuery),
    responses(
        (status = 200, description = "One page of matching tasks, starred first then newest, wrapped in the success envelope", body = dto::task::TaskPage),
        (status = 400, description = "Invalid filter or paging parameters", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Lists the signed-in user's tasks with filtering and pagination
async fn tasks_for_user(
    user_id: Uuid,
    query: dto::task::TaskQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::task::TaskPage>, ApiError> {
    info!(%user_id, "Listing tasks");
    query.validate()?;

    let (filter, page) = query.into_filter_and_page()?;
    let task_reader = persistence::db_task_driven_ports::DbReadTasks;
    let task_page = task_service
        .tasks_for_user(user_id, &filter, &page, ext_cxn, &task_reader)
        .await?;

    Ok(Success::ok(task_page.into()))
}

#[utoipa::path(
    get,
    path = "/tasks/history",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    params(dto::task::TaskQuery),
    responses(
        (status = 200, description = "One page of completed tasks, wrapped in the success envelope", body = dto::task::TaskPage),
        (status = 400, description = "Invalid filter or paging parameters", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Lists the signed-in user's completed tasks. The `completed` parameter is ignored.
async fn task_history(
    user_id: Uuid,
    query: dto::task::TaskQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::task::TaskPage>, ApiError> {
    info!(%user_id, "Listing task history");
    query.validate()?;

    let (filter, page) = dto::task::TaskQuery {
        completed: None,
        ..query
    }
    .into_filter_and_page()?;
    let task_reader = persistence::db_task_driven_ports::DbReadTasks;
    let task_page = task_service
        .task_history(user_id, &filter, &page, ext_cxn, &task_reader)
        .await?;

    Ok(Success::ok(task_page.into()))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    params(
        ("task_id" = Uuid, Path, description = "ID of the task"),
    ),
    responses(
        (status = 200, description = "The task, wrapped in the success envelope", body = dto::task::Task),
        (status = 400, description = "Malformed task ID", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Task not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Retrieves one of the signed-in user's tasks
async fn task_by_id(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::task::Task>, ApiError> {
    info!(%user_id, %task_id, "Fetching task");
    let task_reader = persistence::db_task_driven_ports::DbReadTasks;
    let task = task_service
        .user_task_by_id(user_id, task_id, ext_cxn, &task_reader)
        .await?;

    Ok(Success::ok(task.into()))
}

#[utoipa::path(
    patch,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    params(
        ("task_id" = Uuid, Path, description = "ID of the task"),
    ),
    request_body = dto::task::UpdateTask,
    responses(
        (status = 200, description = "Updated task, wrapped in the success envelope", body = dto::task::Task),
        (status = 400, description = "Malformed task ID or invalid task data", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Task or category not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Changes one of the signed-in user's tasks. Only fields present in the body are modified.
async fn update_task(
    user_id: Uuid,
    task_id: Uuid,
    update: dto::task::UpdateTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::task::Task>, ApiError> {
    info!(%user_id, %task_id, "Updating task");
    update.validate()?;

    let update = domain::task::UpdateTask::try_from(update)?;
    let task_reader = persistence::db_task_driven_ports::DbReadTasks;
    let task_writer = persistence::db_task_driven_ports::DbWriteTasks;
    let category_detector = persistence::db_category_driven_ports::DbDetectCategory;
    let updated_task = task_service
        .update_task(
            user_id,
            task_id,
            &update,
            ext_cxn,
            &task_reader,
            &task_writer,
            &category_detector,
        )
        .await?;

    Ok(Success::ok(updated_task.into()))
}

#[utoipa::path(
    patch,
    path = "/tasks/{task_id}/toggle-complete",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    params(
        ("task_id" = Uuid, Path, description = "ID of the task"),
    ),
    responses(
        (status = 200, description = "Task with its completion flipped, wrapped in the success envelope", body = dto::task::Task),
        (status = 400, description = "Malformed task ID", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Task not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Marks a task complete if it was open, or open if it was complete
async fn toggle_completion(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::task::Task>, ApiError> {
    info!(%user_id, %task_id, "Toggling task completion");
    let task_reader = persistence::db_task_driven_ports::DbReadTasks;
    let task_writer = persistence::db_task_driven_ports::DbWriteTasks;
    let toggled_task = task_service
        .toggle_completion(user_id, task_id, ext_cxn, &task_reader, &task_writer)
        .await?;

    Ok(Success::ok(toggled_task.into()))
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    security(("bearer" = [])),
    params(
        ("task_id" = Uuid, Path, description = "ID of the task"),
    ),
    responses(
        (status = 200, description = "Task deleted", body = dto::auth::Message),
        (status = 400, description = "Malformed task ID", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Task not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Deletes one of the signed-in user's tasks
async fn delete_task(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Success<dto::auth::Message>, ApiError> {
    info!(%user_id, %task_id, "Deleting task");
    let task_writer = persistence::db_task_driven_ports::DbWriteTasks;
    let acknowledgement = task_service
        .delete_task(user_id, task_id, ext_cxn, &task_writer)
        .await?;

    Ok(Success::ok(acknowledgement.into()))
}
