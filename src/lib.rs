//! dbproxy: HTTP CRUD over MySQL, with the database schema reconciled against a schema file at boot.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_schema, parse_schema, DesiredSchema, ProxyConfig, RetryPolicy};
pub use db::{Database, QueryExecutor};
pub use error::{AppError, BootError, ConfigError, ConnectError, QueryError, ReconcileError};
pub use migration::{reconcile, Introspector, ReconcileReport, SchemaBackend};
pub use routes::{status_routes, entity_routes};
pub use service::CrudService;
pub use state::AppState;

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Full router: health/readiness plus collection CRUD.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(status_routes(state.clone()))
        .merge(entity_routes(state))
}

/// Connect, load the schema, reconcile, then serve. Nothing is served before reconciliation returns.
pub async fn serve(config: ProxyConfig) -> Result<(), BootError> {
    let db = Database::connect(&config.database, &config.retry).await?;
    let schema = load_schema(&config.schema_path).await?;
    reconcile(&Introspector::new(&db), &schema).await?;

    let state = AppState::new(Arc::new(db), Arc::new(schema));
    let listener = TcpListener::bind(("0.0.0.0", config.listen_port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
