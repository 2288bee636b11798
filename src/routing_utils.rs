use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};
use derive_more::Display;
use serde::Serialize;
use tracing::error;
use utoipa::openapi::{RefOr, Schema};
use utoipa::{ToSchema, openapi};
use validator::ValidationErrors;

/// Body of every successful response: the payload wrapped alongside the status code
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SuccessEnvelope<T> {
    status_code: u16,
    message: &'static str,
    data: T,
}

/// A successful response whose body is wrapped in the standard success envelope
pub struct Success<T> {
    status: StatusCode,
    data: T,
}

impl<T> Success<T> {
    /// 200 OK
    pub fn ok(data: T) -> Self {
        Success {
            status: StatusCode::OK,
            data,
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Success {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        let envelope = SuccessEnvelope {
            status_code: self.status.as_u16(),
            message: "Success",
            data: self.data,
        };

        (self.status, axum::Json(envelope)).into_response()
    }
}

/// The kinds of failure the API reports, each tied to one HTTP status. Displays as the
/// kind name clients see in the `error` field.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    ValidationError,
    InternalError,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicErrorResponse {
    #[schema(example = 404)]
    pub status_code: u16,
    /// Kind of failure: NotFound, Conflict, Unauthorized, ValidationError or InternalError
    #[schema(example = "NotFound")]
    pub error: String,
    #[schema(example = "Task not found")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<ExtraInfo>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

/// An error the API reports to the client as a [BasicErrorResponse]
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    extra_info: Option<ExtraInfo>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
            extra_info: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn with_extra_info(mut self, extra_info: ExtraInfo) -> Self {
        self.extra_info = Some(extra_info);
        self
    }

    /// Logs an infrastructure failure and hides its details from the client
    pub fn internal(cause: anyhow::Error) -> Self {
        error!("Request failed: {cause:#}");
        Self::new(
            ErrorKind::InternalError,
            "Could not access data to complete your request",
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        (
            status,
            axum::Json(BasicErrorResponse {
                status_code: status.as_u16(),
                error: self.kind.to_string(),
                message: self.message,
                extra_info: self.extra_info,
            }),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        ApiError::validation("Submitted data was invalid.")
            .with_extra_info(ExtraInfo::ValidationIssues(ValidationErrorSchema(value)))
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::validation("The passed request body contained malformed or unreadable JSON.")
            .with_extra_info(ExtraInfo::Message(value.body_text()))
    }
}

/// Wrapper for [axum::extract::Query] which reports unreadable query strings as validation errors
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::validation("The query string could not be read.")
            .with_extra_info(ExtraInfo::Message(value.body_text()))
    }
}

/// Wrapper for [axum::extract::Path] which reports malformed IDs as validation errors
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::validation("The requested path contained an invalid identifier.")
            .with_extra_info(ExtraInfo::Message(value.body_text()))
    }
}
