use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// DTO for the public view of a user
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct UserProfile {
    #[schema(example = "5f8d3a0e-6c1b-4f7a-9f3e-2b1c4d5e6f70")]
    pub id: Uuid,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "/uploads/profiles/0b6f1c2e-8f4e-4a57-b3a4-9d2c7e1f5a60.png")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::user::UserProfile> for UserProfile {
    fn from(value: domain::user::UserProfile) -> Self {
        UserProfile {
            id: value.id,
            name: value.name,
            email: value.email,
            profile_image: value.profile_image,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for changing a user's display name
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct UpdateName {
    #[validate(length(min = 1))]
    #[schema(example = "Jane Smith")]
    pub name: String,
}

/// DTO for changing a user's password
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize))]
pub struct ResetPassword {
    #[validate(length(min = 1))]
    #[schema(example = "password123")]
    pub old_password: String,
    #[validate(length(min = 6))]
    #[schema(example = "betterPassword456")]
    pub new_password: String,
}

impl From<ResetPassword> for domain::user::PasswordChange {
    fn from(value: ResetPassword) -> Self {
        domain::user::PasswordChange {
            old_password: value.old_password,
            new_password: value.new_password,
        }
    }
}

/// Multipart form for uploading a profile picture. Only used for documentation, the upload
/// handler reads the form field by field.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProfileImageForm {
    /// JPEG, PNG, GIF or WebP image of at most 5 MiB
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}
