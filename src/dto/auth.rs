use crate::domain;
use crate::dto::user::UserProfile;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for creating an account
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct Register {
    #[validate(length(min = 1))]
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[validate(email)]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 6))]
    #[schema(example = "password123")]
    pub password: String,
}

impl From<Register> for domain::auth::Registration {
    fn from(value: Register) -> Self {
        domain::auth::Registration {
            name: value.name,
            email: value.email,
            password: value.password,
        }
    }
}

/// DTO for signing in
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct Login {
    #[validate(email)]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 1))]
    #[schema(example = "password123")]
    pub password: String,
}

impl From<Login> for domain::auth::Credentials {
    fn from(value: Login) -> Self {
        domain::auth::Credentials {
            email: value.email,
            password: value.password,
        }
    }
}

/// DTO returned after registering or signing in
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct SessionInfo {
    pub user: UserProfile,
    /// Send this as a bearer token on authenticated requests
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
}

impl From<domain::auth::Session> for SessionInfo {
    fn from(value: domain::auth::Session) -> Self {
        SessionInfo {
            user: value.user.into(),
            access_token: value.access_token,
        }
    }
}

/// DTO carrying a human-readable confirmation
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct Message {
    #[schema(example = "Task deleted successfully")]
    pub message: String,
}

impl From<domain::Acknowledgement> for Message {
    fn from(value: domain::Acknowledgement) -> Self {
        Message {
            message: value.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_registration_gets_rejected() {
        let bad_registration = Register {
            name: String::new(),
            email: "not-an-email".to_owned(),
            password: "short".to_owned(),
        };
        let Err(validation_errors) = bad_registration.validate() else {
            panic!("Validation should have failed");
        };
        let field_validations = validation_errors.field_errors();
        assert!(field_validations.contains_key("name"));
        assert!(field_validations.contains_key("email"));
        assert!(field_validations.contains_key("password"));
    }
}
