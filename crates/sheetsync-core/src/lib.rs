//! `sheetsync-core`: keeps spreadsheet tabs mirroring database collections.
//!
//! ```text
//! Coordinator ── discover ──▶ Source::list_collections
//!      │
//!      ├─ per collection, sequentially ──▶ Exporter ──▶ Source::fetch_all
//!      │                                       │
//!      │                                       └──▶ SheetGrid ──▶ Sink::write_grid
//!      │
//!      └─ per collection, concurrently ──▶ Subscriber ── event ──▶ Exporter
//! ```
//!
//! The database and spreadsheet are reached only through the [`Source`] and
//! [`Sink`] traits; `memory` provides in-process versions of both.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod grid;
pub mod memory;
pub mod retry;
pub mod sink;
pub mod source;
pub mod status;
pub mod subscriber;
pub mod types;

pub use context::SyncContext;
pub use coordinator::{Coordinator, SyncHandle};
pub use error::{Result, SyncError};
pub use export::{ExportOutcome, Exporter};
pub use grid::SheetGrid;
pub use sink::Sink;
pub use source::{ChangeStream, Source};
pub use status::SyncStatus;
pub use types::{ChangeEvent, Record};
