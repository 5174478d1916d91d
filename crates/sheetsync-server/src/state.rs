use std::sync::Arc;

use sheetsync_core::SyncStatus;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub status: Arc<SyncStatus>,
}

impl AppState {
    pub fn new(status: Arc<SyncStatus>) -> Self {
        Self { status }
    }
}
