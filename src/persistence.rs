pub mod db_category_driven_ports;
pub mod db_task_driven_ports;
pub mod db_user_driven_ports;

use crate::domain::DrivenPortError;
use crate::external_connections;
use crate::external_connections::ConnectionHandle;
use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres};
use std::time::Duration;

/// Postgres error code raised when a unique index rejects a write
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code raised when a foreign key rejects a write
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Data structure which owns clients for connecting to external systems.
/// Allows business logic to be agnostic of the external systems it communicates with
/// so driven adapters can easily be swapped out for other implementations
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: PgPool,
}

impl ExternalConnectivity {
    /// Accepts the set of clients used to connect to external systems and constructs
    /// an instance of ExternalConnectivity owning those clients
    pub fn new(db: PgPool) -> Self {
        ExternalConnectivity { db }
    }
}

/// A handle from ExternalConnectivity which can connect to a database
pub struct PoolConnectionHandle {
    active_connection: PoolConnection<Postgres>,
}

impl ConnectionHandle for PoolConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut self.active_connection
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type DbHandle<'cxn_borrow> = PoolConnectionHandle;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
        let handle = PoolConnectionHandle {
            active_connection: self
                .db
                .acquire()
                .await
                .context("acquiring connection from the database pool")?,
        };

        Ok(handle)
    }
}

/// Opens the connection pool for the application database
pub async fn connect_sqlx(db_url: &str) -> Result<PgPool, anyhow::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(2))
        .connect(db_url)
        .await
        .context("connecting to the database")
}

/// Brings the database schema up to date
pub async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("running database migrations")
}

/// Utility DTO for consuming the output of the PostgreSQL `count()` function
#[derive(sqlx::FromRow)]
struct Count {
    count: Option<i64>,
}

impl Count {
    /// Retrieve the count value, as it's typechecked to be optional but should always be present
    fn count(&self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Translates a failed write into a [DrivenPortError], separating constraint violations
/// (which the domain can act on) from everything else
fn classify_write_error(error: sqlx::Error, action: &'static str) -> DrivenPortError {
    if let sqlx::Error::Database(ref db_err) = error {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return DrivenPortError::Conflict,
            Some(FOREIGN_KEY_VIOLATION) => return DrivenPortError::DoesNotExist,
            _ => {}
        }
    }

    DrivenPortError::CommsFailure(anyhow::Error::new(error).context(action))
}
