//! Sink-side seam: the spreadsheet the sync writes to.

use async_trait::async_trait;

use crate::error::Result;
use crate::grid::SheetGrid;

/// Destination for exported grids.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Overwrite the tab named `tab` starting at `A1` with `grid`.
    ///
    /// Cells outside the grid's extent are left as they were. Failures are
    /// `SyncError::SinkWrite`.
    async fn write_grid(&self, tab: &str, grid: &SheetGrid) -> Result<()>;
}
