use anyhow::{Context, anyhow};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// URL for accessing the PostgreSQL database
pub const DB_URL: &str = "DATABASE_URL";
/// Log level configuration for the application, in [EnvFilter](tracing_subscriber::EnvFilter) directive syntax
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Secret used to sign session tokens
pub const JWT_SECRET: &str = "JWT_SECRET";
/// How long a session token stays valid, in minutes
pub const SESSION_TTL_MINS: &str = "SESSION_TTL_MINS";
/// Port the HTTP server listens on
pub const PORT: &str = "PORT";
/// Directory uploaded profile images are written to
pub const UPLOAD_DIR: &str = "UPLOAD_DIR";

const DEFAULT_SESSION_TTL_MINS: i64 = 24 * 60;
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_UPLOAD_DIR: &str = "uploads/profiles";

/// Settings the server needs at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_url: String,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    pub port: u16,
    pub upload_dir: PathBuf,
}

impl AppConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<AppConfig, anyhow::Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from any source of named values. Unset optional settings fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig, anyhow::Error> {
        let db_url = lookup(DB_URL).with_context(|| format!("{DB_URL} must be set"))?;
        let jwt_secret = lookup(JWT_SECRET)
            .filter(|secret| !secret.trim().is_empty())
            .with_context(|| format!("{JWT_SECRET} must be set to a non-empty value"))?;

        let session_ttl_mins: i64 = parse_or_default(&lookup, SESSION_TTL_MINS, DEFAULT_SESSION_TTL_MINS)?;
        if session_ttl_mins <= 0 {
            return Err(anyhow!("{SESSION_TTL_MINS} must be a positive number of minutes"));
        }
        let port = parse_or_default(&lookup, PORT, DEFAULT_PORT)?;
        let upload_dir = lookup(UPLOAD_DIR)
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_owned());

        Ok(AppConfig {
            db_url,
            jwt_secret,
            session_ttl: chrono::Duration::minutes(session_ttl_mins),
            port,
            upload_dir: PathBuf::from(upload_dir),
        })
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
    }
}
