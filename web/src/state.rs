//! Application state shared across HTTP handlers.

use std::sync::Arc;
use wereda_core::QueueEngine;

/// Shared state: the queue engine, cloned cheaply per request via `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The queue engine all handlers delegate to.
    pub engine: Arc<QueueEngine>,
}

impl AppState {
    /// Create the application state.
    #[must_use]
    pub fn new(engine: Arc<QueueEngine>) -> Self {
        Self { engine }
    }
}
