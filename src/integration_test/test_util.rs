use crate::domain::user::CreateUser;
use crate::domain::user::driven_ports::UserWriter;
use crate::{app_env, persistence};
use dotenv::dotenv;
use lazy_static::lazy_static;
use rand::{Rng, thread_rng};
use sqlx::{Connection, PgConnection, PgPool};
use std::env;
use std::future::Future;
use tokio::runtime::Runtime;
use uuid::Uuid;

lazy_static! {
    static ref TOKIO_RT: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Tokio runtime failed to initialize");
}

/// A throwaway database cloned from the server's "postgres" database
struct TestDatabase {
    base_url: String,
    db_name: String,
}

impl TestDatabase {
    async fn create(base_url: String) -> Result<Self, sqlx::Error> {
        let db_name = format!("test_db_{}", thread_rng().gen_range(10_000..99_999));

        let mut admin_cxn = PgConnection::connect(&format!("{base_url}/postgres")).await?;
        let create_result = sqlx::query(&format!("CREATE DATABASE {db_name} TEMPLATE postgres"))
            .execute(&mut admin_cxn)
            .await;
        admin_cxn.close().await?;
        create_result?;

        Ok(TestDatabase { base_url, db_name })
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.db_name)
    }

    async fn drop_database(self) {
        let Ok(mut admin_cxn) = PgConnection::connect(&format!("{}/postgres", self.base_url)).await
        else {
            println!(
                "Warning: could not connect to drop test database {}, you may need to do it manually.",
                self.db_name
            );
            return;
        };

        let drop_result = sqlx::query(&format!("DROP DATABASE IF EXISTS {}", self.db_name))
            .execute(&mut admin_cxn)
            .await;
        if drop_result.is_err() {
            println!(
                "Warning: failed to drop test database {}, you may need to do it manually.",
                self.db_name
            );
        }
        let _ = admin_cxn.close().await;
    }
}

/// Creates a temp database for a test by using the "postgres" database as a template, brings its
/// schema up to date, and hands the test a pool connected to it. The database is dropped afterward.
///
/// Expects that the TEST_DB_URL environment variable is populated
pub fn prepare_db_and_test<F, R>(test_fn: F)
where
    R: Future<Output = ()>,
    F: FnOnce(PgPool) -> R,
{
    if dotenv().is_err() {
        println!("Test is running without .env file.");
    }

    TOKIO_RT.block_on(async move {
        let base_url = env::var(app_env::test::TEST_DB_URL).expect(
            "You must provide the TEST_DB_URL environment variable as the base postgres connection string",
        );
        let test_db = TestDatabase::create(base_url)
            .await
            .unwrap_or_else(|db_err| panic!("Failed to create test database: {db_err}"));

        let pool = persistence::connect_sqlx(&test_db.url())
            .await
            .expect("Could not connect to test database");
        persistence::run_migrations(&pool)
            .await
            .expect("Could not migrate test database");

        test_fn(pool.clone()).await;

        pool.close().await;
        test_db.drop_database().await;
    });
}

/// Registers a user directly through the persistence layer and returns their ID
pub async fn create_user(ext_cxn: &mut persistence::ExternalConnectivity, email: &str) -> Uuid {
    persistence::db_user_driven_ports::DbWriteUsers
        .create_user(
            &CreateUser {
                name: "Integration Tester".to_owned(),
                email: email.to_owned(),
                password_hash: "not-a-real-hash".to_owned(),
            },
            ext_cxn,
        )
        .await
        .expect("Could not create test user")
        .id
}
