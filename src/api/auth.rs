use crate::domain::auth::driven_ports::SessionTokens;
use crate::domain::auth::driving_ports::{AuthError, AuthPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, Json, Success};
use crate::{AppState, SharedData, domain, dto, persistence, security};
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(register, login, logout))]
/// Defines the OpenAPI documentation for the authentication API
pub struct AuthApi;
/// Constant used to group authentication endpoints in OpenAPI documentation
pub const AUTH_API_GROUP: &str = "Auth";

/// Builds a router for all the authentication routes
pub fn auth_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/register",
            post(
                |State(app_state): AppState, Json(new_user): Json<dto::auth::Register>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    register(
                        new_user,
                        &mut ext_cxn,
                        &domain::auth::AuthService,
                        &app_state.session_tokens,
                    )
                    .await
                },
            ),
        )
        .route(
            "/login",
            post(
                |State(app_state): AppState, Json(credentials): Json<dto::auth::Login>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    login(
                        credentials,
                        &mut ext_cxn,
                        &domain::auth::AuthService,
                        &app_state.session_tokens,
                    )
                    .await
                },
            ),
        )
        .route(
            "/logout",
            post(|| async { logout(&domain::auth::AuthService) }),
        )
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::EmailTaken => ApiError::conflict(value.to_string()),
            AuthError::InvalidCredentials => ApiError::unauthorized(value.to_string()),
            AuthError::PortError(cause) => ApiError::internal(cause),
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = AUTH_API_GROUP,
    request_body = dto::auth::Register,
    responses(
        (status = 201, description = "Account created, wrapped in the success envelope", body = dto::auth::SessionInfo),
        (status = 400, description = "Invalid registration data", body = BasicErrorResponse),
        (status = 409, description = "Email already registered", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Opens a new account and signs the new user in
async fn register(
    new_user: dto::auth::Register,
    ext_cxn: &mut impl ExternalConnectivity,
    auth_service: &impl AuthPort,
    tokens: &impl SessionTokens,
) -> Result<Success<dto::auth::SessionInfo>, ApiError> {
    info!("Registering a new user");
    new_user.validate()?;

    let registration = domain::auth::Registration::from(new_user);
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;
    let user_writer = persistence::db_user_driven_ports::DbWriteUsers;
    let session = auth_service
        .register(
            &registration,
            ext_cxn,
            &user_reader,
            &user_writer,
            &security::Argon2PasswordHasher,
            tokens,
        )
        .await?;

    Ok(Success::created(session.into()))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = AUTH_API_GROUP,
    request_body = dto::auth::Login,
    responses(
        (status = 200, description = "Signed in, wrapped in the success envelope", body = dto::auth::SessionInfo),
        (status = 400, description = "Invalid login data", body = BasicErrorResponse),
        (status = 401, description = "Wrong email or password", body = BasicErrorResponse),
        (status = 500, description = "Internal error", body = BasicErrorResponse),
    ),
)]
/// Signs an existing user in
async fn login(
    credentials: dto::auth::Login,
    ext_cxn: &mut impl ExternalConnectivity,
    auth_service: &impl AuthPort,
    tokens: &impl SessionTokens,
) -> Result<Success<dto::auth::SessionInfo>, ApiError> {
    info!("User signing in");
    credentials.validate()?;

    let credentials = domain::auth::Credentials::from(credentials);
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;
    let session = auth_service
        .login(
            &credentials,
            ext_cxn,
            &user_reader,
            &security::Argon2PasswordHasher,
            tokens,
        )
        .await?;

    Ok(Success::ok(session.into()))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = AUTH_API_GROUP,
    responses(
        (status = 200, description = "Client should discard its token", body = dto::auth::Message),
    ),
)]
/// Signs the caller out. Tokens are stateless, so the client just drops its token.
fn logout(auth_service: &impl AuthPort) -> Success<dto::auth::Message> {
    Success::ok(auth_service.logout().into())
}
