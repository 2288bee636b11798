use super::classify_write_error;
use crate::domain;
use crate::domain::DrivenPortError;
use crate::domain::user::{CreateUser, User};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::query_as;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password, profile_image, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    profile_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(value: UserRow) -> Self {
        User {
            id: value.id,
            name: value.name,
            email: value.email,
            password_hash: value.password,
            profile_image: value.profile_image,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

pub struct DbReadUsers;

impl domain::user::driven_ports::UserReader for DbReadUsers {
    async fn user_by_id(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("fetching a user by id")?;

        Ok(user.map(User::from))
    }

    async fn user_by_email(
        &self,
        email: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("fetching a user by email")?;

        Ok(user.map(User::from))
    }
}

pub struct DbWriteUsers;

impl domain::user::driven_ports::UserWriter for DbWriteUsers {
    async fn create_user(
        &self,
        user: &CreateUser,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<User, DrivenPortError> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let created = query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email, password) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .map_err(|err| classify_write_error(err, "inserting a new user"))?;

        Ok(created.into())
    }

    async fn update_name(
        &self,
        user_id: Uuid,
        name: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let updated = query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("renaming a user")?;

        Ok(updated.map(User::from))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("storing a new password hash")?;

        Ok(())
    }

    async fn update_profile_image(
        &self,
        user_id: Uuid,
        image_path: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let updated = query_as::<_, UserRow>(&format!(
            "UPDATE users SET profile_image = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(image_path)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("updating a user's profile image")?;

        Ok(updated.map(User::from))
    }
}
