use std::sync::Arc;

use crate::config::Settings;
use crate::sink::Sink;
use crate::source::Source;
use crate::status::SyncStatus;

/// Handles shared by every component, built once at startup.
///
/// The source and sink are only ever used through `&self`, so every
/// collection task shares the same clients.
#[derive(Clone)]
pub struct SyncContext {
    pub source: Arc<dyn Source>,
    pub sink: Arc<dyn Sink>,
    pub settings: Settings,
    pub status: Arc<SyncStatus>,
}

impl SyncContext {
    pub fn new(source: Arc<dyn Source>, sink: Arc<dyn Sink>, settings: Settings) -> Self {
        Self {
            source,
            sink,
            settings,
            status: Arc::new(SyncStatus::new()),
        }
    }

    /// Share an existing tracker, e.g. one the HTTP server already holds.
    pub fn with_status(mut self, status: Arc<SyncStatus>) -> Self {
        self.status = status;
        self
    }
}
