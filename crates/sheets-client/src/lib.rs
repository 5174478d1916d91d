//! `sheets-client`: Google Sheets as a [`sheetsync_core::Sink`].
//!
//! # Architecture
//!
//! ```text
//! SheetsClient ──► TokenProvider ──► (StaticToken | ServiceAccountAuth)
//!      │                                        │
//!      │  PUT /v4/spreadsheets/{id}/values/     │  POST token_uri
//!      │      {tab}!A1?valueInputOption=RAW     │  grant_type=jwt-bearer
//!      ▼                                        ▼
//!  sheets.googleapis.com                oauth2.googleapis.com
//! ```
//!
//! Each write replaces the tab's contents starting at `A1` with the grid's
//! rows. Values are sent with `RAW` input so text like `=1+1` is stored
//! verbatim instead of being evaluated.
//!
//! Failures map to [`sheetsync_core::SyncError::SinkWrite`]; quota (429)
//! and server-side (5xx) responses are marked retryable, everything else
//! is permanent.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{ServiceAccountAuth, StaticToken, TokenProvider, SHEETS_SCOPE};
pub use client::SheetsClient;
pub use error::SheetsError;
pub use types::UpdateValuesResponse;
