use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Lifecycle of one collection's change subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    Idle,
    Watching,
    Triggering,
    Closed,
}

/// Where the coordinator is in its startup sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum StartupPhase {
    Starting,
    Running,
    Failed { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStatus {
    pub state: Option<WatchState>,
    pub exports_ok: u64,
    pub exports_failed: u64,
    pub reconnects: u64,
    pub last_rows: Option<usize>,
    pub last_export_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Point-in-time copy of everything the tracker knows, as served on `/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub startup: StartupPhase,
    pub collections: BTreeMap<String, CollectionStatus>,
}

// ---------------------------------------------------------------------------
// SyncStatus
// ---------------------------------------------------------------------------

/// Shared, in-memory sync health: startup phase plus per-collection counters.
///
/// Written by the exporter and subscribers, read by the HTTP status route.
/// Critical sections are a few field updates, so a std mutex is enough.
#[derive(Debug)]
pub struct SyncStatus {
    inner: Mutex<StatusSnapshot>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusSnapshot {
                startup: StartupPhase::Starting,
                collections: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_phase(&self, phase: StartupPhase) {
        self.lock().startup = phase;
    }

    pub fn phase(&self) -> StartupPhase {
        self.lock().startup.clone()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.lock().startup, StartupPhase::Failed { .. })
    }

    pub fn set_state(&self, collection: &str, state: WatchState) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .state = Some(state);
    }

    pub fn record_success(&self, collection: &str, rows: usize) {
        let mut inner = self.lock();
        let entry = inner.collections.entry(collection.to_string()).or_default();
        entry.exports_ok += 1;
        entry.last_rows = Some(rows);
        entry.last_export_at = Some(Utc::now());
        entry.last_error = None;
    }

    pub fn record_failure(&self, collection: &str, error: &str) {
        let mut inner = self.lock();
        let entry = inner.collections.entry(collection.to_string()).or_default();
        entry.exports_failed += 1;
        entry.last_error = Some(error.to_string());
    }

    pub fn record_reconnect(&self, collection: &str) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .reconnects += 1;
    }

    pub fn collection(&self, collection: &str) -> Option<CollectionStatus> {
        self.lock().collections.get(collection).cloned()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_starting_phase() {
        let status = SyncStatus::new();
        assert_eq!(status.phase(), StartupPhase::Starting);
        assert!(!status.is_failed());
    }

    #[test]
    fn success_clears_last_error() {
        let status = SyncStatus::new();
        status.record_failure("users", "quota exceeded");
        status.record_success("users", 3);
        let users = status.collection("users").unwrap();
        assert_eq!(users.exports_ok, 1);
        assert_eq!(users.exports_failed, 1);
        assert_eq!(users.last_rows, Some(3));
        assert!(users.last_error.is_none());
        assert!(users.last_export_at.is_some());
    }

    #[test]
    fn failed_phase_is_reported() {
        let status = SyncStatus::new();
        status.set_phase(StartupPhase::Failed {
            error: "no route to host".into(),
        });
        assert!(status.is_failed());
    }

    #[test]
    fn snapshot_serializes_phase_tag() {
        let status = SyncStatus::new();
        status.set_phase(StartupPhase::Running);
        status.set_state("logs", WatchState::Watching);
        let json = serde_json::to_value(status.snapshot()).unwrap();
        assert_eq!(json["startup"]["phase"], "running");
        assert_eq!(json["collections"]["logs"]["state"], "watching");
    }
}
