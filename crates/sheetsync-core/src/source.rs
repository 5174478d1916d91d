//! Source-side seam: the database the sync reads from.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChangeEvent, Record};

/// Live change notifications for one collection.
///
/// The stream ending (or yielding `Err`) means the subscription is gone.
pub type ChangeStream = BoxStream<'static, Result<ChangeEvent>>;

/// A database whose collections are mirrored into the spreadsheet.
///
/// Implementations are shared across every collection's tasks behind an
/// `Arc`, so all methods take `&self`.
#[async_trait]
pub trait Source: Send + Sync {
    /// Names of the collections currently present.
    ///
    /// Connection or listing failures are `SyncError::SourceUnavailable`.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Every record in `collection`, in the source's natural order.
    ///
    /// Failures are `SyncError::Fetch`.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>>;

    /// Open a change subscription on `collection`.
    ///
    /// Failures are `SyncError::Watch`.
    async fn watch(&self, collection: &str) -> Result<ChangeStream>;
}
