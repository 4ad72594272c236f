//! Collection CRUD routes. The collection segment maps straight to a table name.

use crate::handlers::entity::{create, delete as delete_handler, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:collection", post(create))
        .route(
            "/:collection/:id",
            get(read).post(update).delete(delete_handler),
        )
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}
