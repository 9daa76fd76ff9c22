//! HTTP API for contacts and their methods.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post, put, MethodRouter};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::db::Database;
use crate::service::ContactService;

mod error;
mod handlers;
mod types;

pub use error::ApiError;
pub use types::{ImportResponse, MessageResponse};

#[derive(Clone)]
pub struct AppState {
    pub service: ContactService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            service: ContactService::new(config.db_path.clone()),
            config: Arc::new(config),
        }
    }
}

/// Every path answers bare OPTIONS and reports unsupported verbs as JSON.
fn endpoint(methods: MethodRouter<AppState>) -> MethodRouter<AppState> {
    methods
        .options(handlers::preflight)
        .fallback(handlers::not_allowed)
}

fn contact_routes() -> Router<AppState> {
    use handlers::*;

    Router::new()
        .route("/contacts", endpoint(get(list_contacts).post(create_contact)))
        .route("/contacts/favorites", endpoint(get(list_favorites)))
        .route("/contacts/export", endpoint(get(export_contacts)))
        .route("/contacts/import", endpoint(post(import_contacts)))
        .route(
            "/contacts/methods/:method_id",
            endpoint(put(update_method).delete(delete_method)),
        )
        .route(
            "/contacts/:id",
            endpoint(get(get_contact).put(update_contact).delete(delete_contact)),
        )
        .route("/contacts/:id/favorite", endpoint(put(toggle_favorite)))
        .route(
            "/contacts/:id/methods",
            endpoint(get(list_methods).post(create_method)),
        )
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let routes = match state.config.mount_path() {
        Some(prefix) => Router::new().nest(&prefix, contact_routes()),
        None => contact_routes(),
    };

    routes
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create or upgrade the schema before accepting requests.
pub fn prepare_database(config: &ServerConfig) -> Result<i32> {
    let db = Database::open_at(&config.db_path).with_context(|| {
        format!("Failed to prepare database {}", config.db_path.display())
    })?;
    let version = db.schema_version()?;
    info!(
        path = %config.db_path.display(),
        version,
        contacts = db.count_contacts()?,
        "Database ready"
    );
    Ok(version)
}

/// Serve until Ctrl+C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    prepare_database(&config)?;

    let bind = config.bind;
    let state = AppState::new(config);
    let prefix = state.config.mount_path().unwrap_or_else(|| "/".to_string());

    info!(
        addr = %bind,
        db = %state.config.db_path.display(),
        %prefix,
        "Starting contact API"
    );

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Contact API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SCHEMA_VERSION;

    #[test]
    fn test_prepare_database_migrates_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("contacts.db");
        let config = ServerConfig::with_db(&path);

        assert_eq!(prepare_database(&config).unwrap(), SCHEMA_VERSION);
        assert!(path.exists());
    }

    #[test]
    fn test_prepare_database_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::with_db(dir.path());

        let err = prepare_database(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to prepare database"));
    }

    #[tokio::test]
    async fn test_serve_fails_before_binding_on_bad_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::with_db(dir.path());
        config.bind = ([127, 0, 0, 1], 0).into();

        assert!(serve(config).await.is_err());
    }
}
