use crate::domain::Acknowledgement;
use crate::domain::auth::driven_ports::PasswordHasher;
use crate::domain::user::driving_ports::UserError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// An account holder, including their stored credentials
#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The parts of a [User] that are safe to show to the user
#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(value: User) -> Self {
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

pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg_attr(test, derive(Clone, Debug))]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// A profile picture which has already passed content type and size checks
#[cfg_attr(test, derive(Clone, Debug))]
pub struct ProfileImageUpload {
    pub extension: String,
    pub contents: Vec<u8>,
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait UserReader {
        async fn user_by_id(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
        async fn user_by_email(
            &self,
            email: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
    }

    pub trait UserWriter {
        /// Fails with [DrivenPortError::Conflict] if the email is already registered
        async fn create_user(
            &self,
            user: &CreateUser,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<User, DrivenPortError>;
        async fn update_name(
            &self,
            user_id: Uuid,
            name: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
        async fn update_password_hash(
            &self,
            user_id: Uuid,
            password_hash: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
        async fn update_profile_image(
            &self,
            user_id: Uuid,
            image_path: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
    }

    /// Somewhere to keep profile pictures. Images are addressed by the public path
    /// returned when they were stored.
    pub trait ImageStore {
        async fn store_image(&self, file_name: &str, contents: &[u8])
        -> Result<String, anyhow::Error>;
        /// Removing an image that no longer exists is not an error
        async fn remove_image(&self, public_path: &str) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum UserError {
        #[error("User not found")]
        NotFound,
        #[error("Current password is incorrect")]
        IncorrectPassword,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait UserPort {
        async fn get_profile(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<UserProfile, UserError>;
        async fn update_name(
            &self,
            user_id: Uuid,
            name: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            u_writer: &impl driven_ports::UserWriter,
        ) -> Result<UserProfile, UserError>;
        async fn reset_password(
            &self,
            user_id: Uuid,
            change: &PasswordChange,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
            u_writer: &impl driven_ports::UserWriter,
            hasher: &impl PasswordHasher,
        ) -> Result<Acknowledgement, UserError>;
        async fn upload_profile_image(
            &self,
            user_id: Uuid,
            upload: &ProfileImageUpload,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
            u_writer: &impl driven_ports::UserWriter,
            image_store: &impl driven_ports::ImageStore,
        ) -> Result<UserProfile, UserError>;
    }
}

/// Removes an image nothing points at anymore. A failed removal only leaves a stray file.
async fn discard_image(
    user_id: Uuid,
    image_path: &str,
    image_store: &impl driven_ports::ImageStore,
) {
    if let Err(remove_err) = image_store.remove_image(image_path).await {
        warn!(%user_id, "could not remove profile image {image_path}: {remove_err:#}");
    }
}

pub struct UserService;

impl driving_ports::UserPort for UserService {
    async fn get_profile(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<UserProfile, UserError> {
        let user = u_reader
            .user_by_id(user_id, &mut *ext_cxn)
            .await
            .context("fetching user profile")?
            .ok_or(UserError::NotFound)?;

        Ok(UserProfile::from(user))
    }

    async fn update_name(
        &self,
        user_id: Uuid,
        name: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        u_writer: &impl driven_ports::UserWriter,
    ) -> Result<UserProfile, UserError> {
        let updated_user = u_writer
            .update_name(user_id, name, &mut *ext_cxn)
            .await
            .context("renaming user")?
            .ok_or(UserError::NotFound)?;

        Ok(UserProfile::from(updated_user))
    }

    async fn reset_password(
        &self,
        user_id: Uuid,
        change: &PasswordChange,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
        u_writer: &impl driven_ports::UserWriter,
        hasher: &impl PasswordHasher,
    ) -> Result<Acknowledgement, UserError> {
        let user = u_reader
            .user_by_id(user_id, &mut *ext_cxn)
            .await
            .context("fetching user for password reset")?
            .ok_or(UserError::NotFound)?;

        let old_password_valid = hasher
            .verify_password(&change.old_password, &user.password_hash)
            .context("verifying old password")?;
        if !old_password_valid {
            return Err(UserError::IncorrectPassword);
        }

        let new_hash = hasher
            .hash_password(&change.new_password)
            .context("hashing new password")?;
        u_writer
            .update_password_hash(user_id, &new_hash, &mut *ext_cxn)
            .await
            .context("storing new password hash")?;
        info!(%user_id, "password reset");

        Ok(Acknowledgement::new("Password updated successfully"))
    }

    async fn upload_profile_image(
        &self,
        user_id: Uuid,
        upload: &ProfileImageUpload,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
        u_writer: &impl driven_ports::UserWriter,
        image_store: &impl driven_ports::ImageStore,
    ) -> Result<UserProfile, UserError> {
        let user = u_reader
            .user_by_id(user_id, &mut *ext_cxn)
            .await
            .context("fetching user for profile image upload")?
            .ok_or(UserError::NotFound)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), upload.extension);
        let image_path = image_store
            .store_image(&file_name, &upload.contents)
            .await
            .context("storing uploaded profile image")?;

        let saved_user = u_writer
            .update_profile_image(user_id, &image_path, &mut *ext_cxn)
            .await
            .context("saving profile image reference");
        let updated_user = match saved_user {
            Ok(Some(updated_user)) => updated_user,
            Ok(None) => {
                discard_image(user_id, &image_path, image_store).await;
                return Err(UserError::NotFound);
            }
            Err(save_err) => {
                discard_image(user_id, &image_path, image_store).await;
                return Err(save_err.into());
            }
        };

        if let Some(old_image) = user.profile_image {
            discard_image(user_id, &old_image, image_store).await;
        }

        Ok(UserProfile::from(updated_user))
    }
}
