use crate::SharedData;
use crate::domain::auth::driven_ports::SessionTokens;
use crate::routing_utils::ApiError;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The authenticated caller, taken from the bearer token on the request. Handlers which
/// extract this never run for unauthenticated requests.
pub struct CurrentUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<Arc<SharedData>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<SharedData>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, &state.session_tokens).map(CurrentUser)
    }
}

/// Resolves the user ID a request's bearer token was issued to
pub fn authenticate(headers: &HeaderMap, tokens: &impl SessionTokens) -> Result<Uuid, ApiError> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Err(ApiError::unauthorized("No token provided"));
    };
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Malformed authorization header"))?;

    tokens.verify_token(token).map_err(|err| {
        debug!("Rejected session token: {err:#}");
        ApiError::unauthorized("Invalid or expired token")
    })
}
