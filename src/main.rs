use crate::app_env::AppConfig;
use crate::security::JwtSessionTokens;
use crate::storage::{DiskImageStore, PROFILE_IMAGE_URL_PREFIX};
use anyhow::Context;
use axum::Router;
use axum::extract::State;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

mod api;
mod app_env;
mod domain;
mod dto;
mod external_connections;
mod logging;
mod persistence;
mod routing_utils;
mod security;
mod storage;


/// Everything request handlers share for the lifetime of the server
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub session_tokens: JwtSessionTokens,
    pub image_store: DiskImageStore,
}

/// Extractor handlers use to reach [SharedData]
pub type AppState = State<Arc<SharedData>>;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    if dotenv().is_err() {
        println!("No .env file found, reading configuration from the environment only.");
    }
    logging::setup_logging(logging::init_env_filter()?);

    let config = AppConfig::from_env().context("loading configuration")?;
    info!(port = config.port, upload_dir = ?config.upload_dir, "Loaded configuration");

    let db_pool = persistence::connect_sqlx(&config.db_url).await?;
    persistence::run_migrations(&db_pool).await?;
    info!("Database migrations applied");

    let shared_data = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(db_pool),
        session_tokens: JwtSessionTokens::new(&config.jwt_secret, config.session_ttl),
        image_store: DiskImageStore::new(config.upload_dir.clone()),
    });
    let router = build_router(shared_data);

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("binding to {address}"))?;
    info!("Starting server on {address}");

    axum::serve(listener, router)
        .await
        .context("running the HTTP server")
}

/// Assembles every route group, the uploaded image files, and the API docs into one router
fn build_router(shared_data: Arc<SharedData>) -> Router {
    let uploaded_images = ServeDir::new(shared_data.image_store.directory());

    let router = Router::new()
        .nest("/auth", api::auth::auth_routes())
        .nest("/users", api::user::user_routes())
        .nest("/categories", api::category::category_routes())
        .nest("/tasks", api::task::task_routes())
        .nest_service(PROFILE_IMAGE_URL_PREFIX, uploaded_images)
        .merge(api::swagger_main::build_documentation())
        .with_state(shared_data);

    logging::attach_tracing_http(router)
}
