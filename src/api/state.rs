//! Application state for the API server

use crate::BatchCoordinator;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The coordinator serving submissions and status reads
    pub coordinator: Arc<BatchCoordinator>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(coordinator: Arc<BatchCoordinator>) -> Self {
        Self { coordinator }
    }
}
