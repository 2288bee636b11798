use crate::api::session::CurrentUser;
use crate::domain::user::driven_ports::ImageStore;
use crate::domain::user::driving_ports::{UserError, UserPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, ExtraInfo, Json, Success};
use crate::{AppState, SharedData, domain, dto, persistence, security};
use axum::Router;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, patch, post};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_profile, update_name, reset_password, upload_profile_image))]
/// Defines the OpenAPI documentation for the user profile API
pub struct UsersApi;
/// Constant used to group user endpoints in OpenAPI documentation
pub const USER_API_GROUP: &str = "Users";

/// Largest profile image accepted, in bytes
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Image subtypes accepted for profile pictures
const ACCEPTED_IMAGE_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];
/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Builds a router for all the user profile routes
pub fn user_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/profile",
            get(
                |State(app_state): AppState, CurrentUser(user_id): CurrentUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    get_profile(user_id, &mut ext_cxn, &domain::user::UserService).await
                },
            ),
        )
        .route(
            "/profile/name",
            patch(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Json(new_name): Json<dto::user::UpdateName>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    update_name(user_id, new_name, &mut ext_cxn, &domain::user::UserService).await
                },
            ),
        )
        .route(
            "/profile/reset-password",
            post(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 Json(change): Json<dto::user::ResetPassword>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    reset_password(user_id, change, &mut ext_cxn, &domain::user::UserService)
                        .await
                },
            ),
        )
        .route(
            "/profile/upload-image",
            post(
                |State(app_state): AppState,
                 CurrentUser(user_id): CurrentUser,
                 form: Result<Multipart, MultipartRejection>| async move {
                    let upload = read_image_form(form).await?;
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    upload_profile_image(
                        user_id,
                        upload,
                        &mut ext_cxn,
                        &domain::user::UserService,
                        &app_state.image_store,
                    )
                    .await
                },
            )
            .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
}

impl From<UserError> for ApiError {
    fn from(value: UserError) -> Self {
        match value {
            UserError::NotFound => ApiError::not_found(value.to_string()),
            UserError::IncorrectPassword => ApiError::unauthorized(value.to_string()),
            UserError::PortError(cause) => ApiError::internal(cause),
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/profile",
    tag = USER_API_GROUP,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's profile, wrapped in the success envelope", body = dto::user::UserProfile),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "User no longer exists", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Retrieves the signed-in user's profile
async fn get_profile(
    user_id: Uuid,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Success<dto::user::UserProfile>, ApiError> {
    info!(%user_id, "Fetching profile");
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;
    let profile = user_service
        .get_profile(user_id, ext_cxn, &user_reader)
        .await?;

    Ok(Success::ok(profile.into()))
}

#[utoipa::path(
    patch,
    path = "/users/profile/name",
    tag = USER_API_GROUP,
    security(("bearer" = [])),
    request_body = dto::user::UpdateName,
    responses(
        (status = 200, description = "Updated profile, wrapped in the success envelope", body = dto::user::UserProfile),
        (status = 400, description = "Invalid name", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "User no longer exists", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Changes the signed-in user's display name
async fn update_name(
    user_id: Uuid,
    new_name: dto::user::UpdateName,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Success<dto::user::UserProfile>, ApiError> {
    info!(%user_id, "Renaming user");
    new_name.validate()?;

    let user_writer = persistence::db_user_driven_ports::DbWriteUsers;
    let profile = user_service
        .update_name(user_id, &new_name.name, ext_cxn, &user_writer)
        .await?;

    Ok(Success::ok(profile.into()))
}

#[utoipa::path(
    post,
    path = "/users/profile/reset-password",
    tag = USER_API_GROUP,
    security(("bearer" = [])),
    request_body = dto::user::ResetPassword,
    responses(
        (status = 200, description = "Password changed", body = dto::auth::Message),
        (status = 400, description = "New password too short", body = BasicErrorResponse),
        (status = 401, description = "Missing token or wrong current password", body = BasicErrorResponse),
        (status = 404, description = "User no longer exists", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Replaces the signed-in user's password after checking the current one
async fn reset_password(
    user_id: Uuid,
    change: dto::user::ResetPassword,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Success<dto::auth::Message>, ApiError> {
    info!(%user_id, "Resetting password");
    change.validate()?;

    let password_change = domain::user::PasswordChange::from(change);
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;
    let user_writer = persistence::db_user_driven_ports::DbWriteUsers;
    let acknowledgement = user_service
        .reset_password(
            user_id,
            &password_change,
            ext_cxn,
            &user_reader,
            &user_writer,
            &security::Argon2PasswordHasher,
        )
        .await?;

    Ok(Success::ok(acknowledgement.into()))
}

#[utoipa::path(
    post,
    path = "/users/profile/upload-image",
    tag = USER_API_GROUP,
    security(("bearer" = [])),
    request_body(content = dto::user::ProfileImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated profile, wrapped in the success envelope", body = dto::user::UserProfile),
        (status = 400, description = "Missing, oversized, or non-image file", body = BasicErrorResponse),
        (status = 401, description = "Missing or invalid token", body = BasicErrorResponse),
        (status = 404, description = "User no longer exists", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Replaces the signed-in user's profile picture
async fn upload_profile_image(
    user_id: Uuid,
    upload: domain::user::ProfileImageUpload,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
    image_store: &impl ImageStore,
) -> Result<Success<dto::user::UserProfile>, ApiError> {
    info!(%user_id, "Uploading profile image");
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;
    let user_writer = persistence::db_user_driven_ports::DbWriteUsers;
    let profile = user_service
        .upload_profile_image(
            user_id,
            &upload,
            ext_cxn,
            &user_reader,
            &user_writer,
            image_store,
        )
        .await?;

    Ok(Success::ok(profile.into()))
}

/// Pulls the `image` field out of a multipart form and checks it is an acceptable picture
async fn read_image_form(
    form: Result<Multipart, MultipartRejection>,
) -> Result<domain::user::ProfileImageUpload, ApiError> {
    let mut form = form.map_err(|rejection| {
        ApiError::validation("Expected a multipart form upload")
            .with_extra_info(ExtraInfo::Message(rejection.body_text()))
    })?;

    while let Some(field) = form.next_field().await.map_err(|err| {
        ApiError::validation("The uploaded form could not be read")
            .with_extra_info(ExtraInfo::Message(err.body_text()))
    })? {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().map(str::to_owned);
        let contents = field.bytes().await.map_err(|err| {
            ApiError::validation("The uploaded image could not be read")
                .with_extra_info(ExtraInfo::Message(err.body_text()))
        })?;

        return image_upload(content_type.as_deref(), contents.to_vec());
    }

    Err(ApiError::validation("No image file provided"))
}

/// Accepts JPEG, PNG, GIF and WebP images up to [MAX_IMAGE_BYTES], taking the file
/// extension from the image subtype
fn image_upload(
    content_type: Option<&str>,
    contents: Vec<u8>,
) -> Result<domain::user::ProfileImageUpload, ApiError> {
    let extension = content_type
        .map(str::to_ascii_lowercase)
        .and_then(|mime| {
            mime.strip_prefix("image/")
                .filter(|subtype| ACCEPTED_IMAGE_TYPES.contains(subtype))
                .map(str::to_owned)
        })
        .ok_or_else(|| ApiError::validation("Only image files are allowed"))?;

    if contents.is_empty() {
        return Err(ApiError::validation("No image file provided"));
    }
    if contents.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::validation("Image must be 5 MiB or smaller"));
    }

    Ok(domain::user::ProfileImageUpload {
        extension,
        contents,
    })
}
