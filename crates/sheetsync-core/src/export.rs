use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info};

use crate::context::SyncContext;
use crate::error::Result;
use crate::grid::SheetGrid;

/// Result of one export cycle. Failures are data here, never `Err`: a failed
/// export is logged, counted, and left for the next trigger to repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { rows: usize },
    Failed { error: String },
}

impl ExportOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ExportOutcome::Written { .. })
    }
}

/// Snapshot exporter: full fetch of a collection, grid build, full rewrite
/// of its tab.
///
/// Exports of the same collection are serialized through a per-name async
/// lock, so two triggers never race on one tab. Different collections never
/// wait on each other.
pub struct Exporter {
    ctx: Arc<SyncContext>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Exporter {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self {
            ctx,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    fn lock_for(&self, collection: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(collection.to_string()).or_default().clone()
    }

    /// Export `collection` into the tab of the same name.
    pub async fn export(&self, collection: &str) -> ExportOutcome {
        let lock = self.lock_for(collection);
        let _guard = lock.lock().await;

        let result = self
            .ctx
            .settings
            .retry
            .run("export", || self.attempt(collection))
            .await;

        match result {
            Ok(rows) => {
                info!(collection, rows, "updated sheet");
                self.ctx.status.record_success(collection, rows);
                ExportOutcome::Written { rows }
            }
            Err(e) => {
                error!(collection, error = %e, "error updating sheet");
                self.ctx.status.record_failure(collection, &e.to_string());
                ExportOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn attempt(&self, collection: &str) -> Result<usize> {
        let records = self.ctx.source.fetch_all(collection).await?;
        let grid = SheetGrid::from_records(&records);
        self.ctx.sink.write_grid(collection, &grid).await?;
        Ok(records.len())
    }
}
