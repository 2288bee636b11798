use crate::api::session::CurrentUser;
use crate::domain::category::driving_ports::{CategoryError, CategoryPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, Json, Path, Success};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(
    create_category,
    categories_for_user,
    category_by_id,
    update_category,
    delete_category
))]
/// Defines the OpenAPI documentation for the category API
pub struct CategoriesApi;
/// Constant used to group category endpoints in OpenAPI documentation
pub const CATEGORY_API_GROUP: &str = "Categories";

/// Builds a router for all the category routes
pub fn category_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState, CurrentUser(user_id): CurrentUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    categories_for_user(user_id, &mut ext_cxn, &domain::category::CategoryService)
                        .await
                },
            )
            .post(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Json(new_category): Json<dto::category::NewCategory>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    create_category(
                        user_id,
                        new_category,
                        &mut ext_cxn,
                        &domain::category::CategoryService,
                    )
                    .await
                },
            ),
        )
        .route(
            "/:category_id",
            get(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(category_id): Path<Uuid>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    category_by_id(
                        user_id,
                        category_id,
                        &mut ext_cxn,
                        &domain::category::CategoryService,
                    )
                    .await
                },
            )
            .patch(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(category_id): Path<Uuid>,
                 Json(update): Json<dto::category::UpdateCategory>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    update_category(
                        user_id,
                        category_id,
                        update,
                        &mut ext_cxn,
                        &domain::category::CategoryService,
                    )
                    .await
                },
            )
            .delete(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Path(category_id): Path<Uuid>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    delete_category(
                        user_id,
                        category_id,
                        &mut ext_cxn,
                        &domain::category::CategoryService,
                    )
                    .await
                },
            ),
        )
}

impl From<CategoryError> for ApiError {
    fn from(value: CategoryError) -> Self {
        match value {
            CategoryError::NotFound => ApiError::not_found(value.to_string()),
            CategoryError::NameTaken => ApiError::conflict(value.to_string()),
            CategoryError::PortError(cause) => ApiError::internal(cause),
        }
    }
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = CATEGORY_API_GROUP,
    security(("bearer" = [])),
    request_body = dto::category::NewCategory,
    responses(
        (status = 201, description = "Category created, wrapped in the success envelope", body = dto::category::Category),
        (status = 400, description = "Invalid category name", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 409, description = "Caller already has a category with this name", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Creates a category for the signed-in user
async fn create_category(
    user_id: Uuid,
    new_category: dto::category::NewCategory,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Success<dto::category::Category>, ApiError> {
    info!(%user_id, "Creating category");
    new_category.validate()?;

    let new_category = domain::category::NewCategory::from(new_category);
    let category_writer = persistence::db_category_driven_ports::DbWriteCategories;
    let category_detector = persistence::db_category_driven_ports::DbDetectCategory;
    let created_category = category_service
        .create_category(
            user_id,
            &new_category,
            ext_cxn,
            &category_writer,
            &category_detector,
        )
        .await?;

    Ok(Success::created(created_category.into()))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = CATEGORY_API_GROUP,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's categories, newest first, wrapped in the success envelope", body = Vec<dto::category::CategoryWithCount>),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Lists the signed-in user's categories along with how many tasks each one holds
async fn categories_for_user(
    user_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Success<Vec<dto::category::CategoryWithCount>>, ApiError> {
    info!(%user_id, "Listing categories");
    let category_reader = persistence::db_category_driven_ports::DbReadCategories;
    let categories = category_service
        .categories_for_user(user_id, ext_cxn, &category_reader)
        .await?;

    Ok(Success::ok(
        categories
            .into_iter()
            .map(dto::category::CategoryWithCount::from)
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/categories/{category_id}",
    tag = CATEGORY_API_GROUP,
    security(("bearer" = [])),
    params(
        ("category_id" = Uuid, Path, description = "ID of the category"),
    ),
    responses(
        (status = 200, description = "The category, wrapped in the success envelope", body = dto::category::CategoryWithCount),
        (status = 400, description = "Malformed category ID", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Category not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Retrieves one of the signed-in user's categories
async fn category_by_id(
    user_id: Uuid,
    category_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Success<dto::category::CategoryWithCount>, ApiError> {
    info!(%user_id, %category_id, "Fetching category");
    let category_reader = persistence::db_category_driven_ports::DbReadCategories;
    let category = category_service
        .user_category_by_id(user_id, category_id, ext_cxn, &category_reader)
        .await?;

    Ok(Success::ok(category.into()))
}

#[utoipa::path(
    patch,
    path = "/categories/{category_id}",
    tag = CATEGORY_API_GROUP,
    security(("bearer" = [])),
    params(
        ("category_id" = Uuid, Path, description = "ID of the category"),
    ),
    request_body = dto::category::UpdateCategory,
    responses(
        (status = 200, description = "Updated category, wrapped in the success envelope", body = dto::category::Category),
        (status = 400, description = "Malformed category ID or invalid name", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Category not found", body = BasicErrorResponse),
        (status = 409, description = "Caller already has a category with this name", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Changes one of the signed-in user's categories
async fn update_category(
    user_id: Uuid,
    category_id: Uuid,
    update: dto::category::UpdateCategory,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Success<dto::category::Category>, ApiError> {
    info!(%user_id, %category_id, "Updating category");
    update.validate()?;

    let update = domain::category::UpdateCategory::from(update);
    let category_reader = persistence::db_category_driven_ports::DbReadCategories;
    let category_writer = persistence::db_category_driven_ports::DbWriteCategories;
    let category_detector = persistence::db_category_driven_ports::DbDetectCategory;
    let updated_category = category_service
        .update_category(
            user_id,
            category_id,
            &update,
            ext_cxn,
            &category_reader,
            &category_writer,
            &category_detector,
        )
        .await?;

    Ok(Success::ok(updated_category.into()))
}

#[utoipa::path(
    delete,
    path = "/categories/{category_id}",
    tag = CATEGORY_API_GROUP,
    security(("bearer" = [])),
    params(
        ("category_id" = Uuid, Path, description = "ID of the category"),
    ),
    responses(
        (status = 200, description = "Category deleted, its tasks are kept without a category", body = dto::auth::Message),
        (status = 400, description = "Malformed category ID", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "Category not found", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Deletes one of the signed-in user's categories
async fn delete_category(
    user_id: Uuid,
    category_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Success<dto::auth::Message>, ApiError> {
    info!(%user_id, %category_id, "Deleting category");
    let category_writer = persistence::db_category_driven_ports::DbWriteCategories;
    let acknowledgement = category_service
        .delete_category(user_id, category_id, ext_cxn, &category_writer)
        .await?;

    Ok(Success::ok(acknowledgement.into()))
}
