use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use utoipa::OpenApi;
use validator::{ValidationError, ValidationErrors};

pub mod auth;
pub mod category;
pub mod task;
pub mod user;

#[derive(OpenApi)]
#[openapi(components(schemas(
    auth::Register,
    auth::Login,
    auth::SessionInfo,
    auth::Message,
    user::UserProfile,
    user::UpdateName,
    user::ResetPassword,
    user::ProfileImageForm,
    category::NewCategory,
    category::UpdateCategory,
    category::Category,
    category::CategoryWithCount,
    task::NewTask,
    task::UpdateTask,
    task::Task,
    task::TaskPage,
    task::PageMeta,
    crate::routing_utils::BasicErrorResponse,
    crate::routing_utils::ExtraInfo,
    crate::routing_utils::ValidationErrorSchema,
)))]
/// Collects the OpenAPI schemas for every DTO so they can be merged into the API documentation
pub struct OpenApiSchemas;

/// Deserializes a field which may be absent, explicitly null, or set. Pair with `#[serde(default)]`
/// so an absent field stays [None] while `null` becomes `Some(None)`.
pub fn nullable_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Builds a [ValidationErrors] reporting a single problem with one field, for checks that
/// happen while converting a DTO into domain data
pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationErrors {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));

    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}
