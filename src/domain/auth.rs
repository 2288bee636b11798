use crate::domain::auth::driving_ports::AuthError;
use crate::domain::user::driven_ports::{UserReader, UserWriter};
use crate::domain::user::{CreateUser, UserProfile};
use crate::domain::{Acknowledgement, DrivenPortError};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use tracing::info;
use uuid::Uuid;

/// Information needed to open a new account
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Information needed to sign in to an existing account
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// An authenticated user along with the token proving their identity on later requests
#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
}

pub mod driven_ports {
    use super::*;

    /// Turns plaintext passwords into storable hashes and checks passwords against them
    pub trait PasswordHasher {
        fn hash_password(&self, password: &str) -> Result<String, anyhow::Error>;
        fn verify_password(&self, password: &str, password_hash: &str)
        -> Result<bool, anyhow::Error>;
    }

    /// Issues and verifies the signed tokens callers present on authenticated requests
    pub trait SessionTokens {
        fn issue_token(&self, user_id: Uuid) -> Result<String, anyhow::Error>;
        /// Returns the ID of the user the token was issued to, or an error if the
        /// token is malformed, forged, or expired
        fn verify_token(&self, token: &str) -> Result<Uuid, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum AuthError {
        #[error("An account with this email already exists")]
        EmailTaken,
        #[error("Invalid email or password")]
        InvalidCredentials,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait AuthPort {
        async fn register(
            &self,
            registration: &Registration,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl UserReader,
            u_writer: &impl UserWriter,
            hasher: &impl driven_ports::PasswordHasher,
            tokens: &impl driven_ports::SessionTokens,
        ) -> Result<Session, AuthError>;
        async fn login(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl UserReader,
            hasher: &impl driven_ports::PasswordHasher,
            tokens: &impl driven_ports::SessionTokens,
        ) -> Result<Session, AuthError>;
        /// Sessions are stateless, so logging out only tells the caller to drop its token
        fn logout(&self) -> Acknowledgement;
    }
}

pub struct AuthService;

impl driving_ports::AuthPort for AuthService {
    async fn register(
        &self,
        registration: &Registration,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl UserReader,
        u_writer: &impl UserWriter,
        hasher: &impl driven_ports::PasswordHasher,
        tokens: &impl driven_ports::SessionTokens,
    ) -> Result<Session, AuthError> {
        let existing_user = u_reader
            .user_by_email(&registration.email, &mut *ext_cxn)
            .await
            .context("looking up email during registration")?;
        if existing_user.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hasher
            .hash_password(&registration.password)
            .context("hashing password for a new user")?;
        let create_result = u_writer
            .create_user(
                &CreateUser {
                    name: registration.name.clone(),
                    email: registration.email.clone(),
                    password_hash,
                },
                &mut *ext_cxn,
            )
            .await;
        let new_user = match create_result {
            Ok(user) => user,
            Err(DrivenPortError::Conflict) => return Err(AuthError::EmailTaken),
            Err(DrivenPortError::DoesNotExist) => {
                return Err(AuthError::PortError(anyhow::anyhow!(
                    "user insert reported a missing reference"
                )));
            }
            Err(DrivenPortError::CommsFailure(err)) => {
                return Err(AuthError::PortError(err.context("creating a new user")));
            }
        };

        let access_token = tokens
            .issue_token(new_user.id)
            .context("issuing a token for a newly registered user")?;
        info!(user_id = %new_user.id, "registered new user");

        Ok(Session {
            user: UserProfile::from(new_user),
            access_token,
        })
    }

    async fn login(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl UserReader,
        hasher: &impl driven_ports::PasswordHasher,
        tokens: &impl driven_ports::SessionTokens,
    ) -> Result<Session, AuthError> {
        let Some(user) = u_reader
            .user_by_email(&credentials.email, &mut *ext_cxn)
            .await
            .context("looking up user during login")?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let password_matches = hasher
            .verify_password(&credentials.password, &user.password_hash)
            .context("verifying password during login")?;
        if !password_matches {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = tokens
            .issue_token(user.id)
            .context("issuing a token during login")?;

        Ok(Session {
            user: UserProfile::from(user),
            access_token,
        })
    }

    fn logout(&self) -> Acknowledgement {
        Acknowledgement::new(
            "Logged out successfully. Please discard your token on the client side.",
        )
    }
}
