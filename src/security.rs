use crate::domain::auth::driven_ports::{PasswordHasher, SessionTokens};
use anyhow::{Context, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hashes passwords with Argon2id and a random salt, storing the result in PHC string format
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> Result<String, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = password_hash::PasswordHasher::hash_password(
            &Argon2::default(),
            password.as_bytes(),
            &salt,
        )
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;

        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, anyhow::Error> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(anyhow!("failed to verify password: {err}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// ID of the user the token was issued to
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks HS256-signed JWTs which identify the user holding them
pub struct JwtSessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtSessionTokens {
    pub fn new(secret: &str, ttl: Duration) -> JwtSessionTokens {
        JwtSessionTokens {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

impl SessionTokens for JwtSessionTokens {
    fn issue_token(&self, user_id: Uuid) -> Result<String, anyhow::Error> {
        let issued_at = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("signing session token")
    }

    fn verify_token(&self, token: &str) -> Result<Uuid, anyhow::Error> {
        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .context("validating session token")?;

        Uuid::parse_str(&token_data.claims.sub).context("session token subject is not a user ID")
    }
}
