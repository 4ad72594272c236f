//! Shared application state for all routes.

use crate::config::DesiredSchema;
use crate::db::QueryExecutor;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn QueryExecutor>,
    /// Loaded once at boot, read-only afterwards.
    pub schema: Arc<DesiredSchema>,
}

impl AppState {
    pub fn new(executor: Arc<dyn QueryExecutor>, schema: Arc<DesiredSchema>) -> Self {
        AppState { executor, schema }
    }
}
