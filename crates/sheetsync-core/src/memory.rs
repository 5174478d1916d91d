//! In-process `Source` and `Sink` implementations.
//!
//! `MemorySource` holds collections in a map and publishes a change event on
//! every mutation; `RecordingSink` keeps every grid it is given. Both expose
//! failure injection so the sync loop can be driven end to end without a
//! database or network.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, Notify};
use tokio_stream::wrappers::BroadcastStream;

use crate::error::{Result, SyncError};
use crate::grid::SheetGrid;
use crate::sink::Sink;
use crate::source::{ChangeStream, Source};
use crate::types::{ChangeEvent, Record};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

struct MemoryCollection {
    records: Vec<Record>,
    events: broadcast::Sender<ChangeEvent>,
    watches: usize,
    failing_fetches: u32,
}

impl MemoryCollection {
    fn new(records: Vec<Record>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            records,
            events,
            watches: 0,
            failing_fetches: 0,
        }
    }

    fn publish(&self, name: &str, operation: &str) {
        // No subscribers yet is fine.
        let _ = self
            .events
            .send(ChangeEvent::new(name).with_operation(operation));
    }
}

/// Collections kept in memory, enumerated in name order.
#[derive(Default)]
pub struct MemorySource {
    collections: Mutex<BTreeMap<String, MemoryCollection>>,
    unavailable: Mutex<bool>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, name: &str, records: Vec<Record>) -> Self {
        lock(&self.collections).insert(name.to_string(), MemoryCollection::new(records));
        self
    }

    /// Add an empty collection. No event is published: nobody can be
    /// watching a collection that did not exist.
    pub fn create_collection(&self, name: &str) {
        lock(&self.collections)
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection::new(Vec::new()));
    }

    /// Append a record and publish an `insert` event. Creates the collection
    /// if needed.
    pub fn insert(&self, name: &str, record: Record) {
        let mut collections = lock(&self.collections);
        let coll = collections
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection::new(Vec::new()));
        coll.records.push(record);
        coll.publish(name, "insert");
    }

    /// Replace all records and publish a `replace` event.
    pub fn replace_all(&self, name: &str, records: Vec<Record>) {
        let mut collections = lock(&self.collections);
        let coll = collections
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection::new(Vec::new()));
        coll.records = records;
        coll.publish(name, "replace");
    }

    /// End every open change stream on `name`. New `watch` calls still work.
    pub fn close_streams(&self, name: &str) {
        if let Some(coll) = lock(&self.collections).get_mut(name) {
            let (events, _) = broadcast::channel(256);
            // Dropping the old sender closes all of its receivers.
            coll.events = events;
        }
    }

    /// Make `list_collections` fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    /// Fail the next `count` fetches of `name`.
    pub fn fail_fetches(&self, name: &str, count: u32) {
        if let Some(coll) = lock(&self.collections).get_mut(name) {
            coll.failing_fetches = count;
        }
    }

    /// How many times `watch` has been called for `name`.
    pub fn watch_count(&self, name: &str) -> usize {
        lock(&self.collections)
            .get(name)
            .map(|c| c.watches)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn list_collections(&self) -> Result<Vec<String>> {
        if *lock(&self.unavailable) {
            return Err(SyncError::SourceUnavailable(
                "memory source marked unavailable".into(),
            ));
        }
        Ok(lock(&self.collections).keys().cloned().collect())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>> {
        let mut collections = lock(&self.collections);
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(Vec::new());
        };
        if coll.failing_fetches > 0 {
            coll.failing_fetches -= 1;
            return Err(SyncError::Fetch {
                collection: collection.to_string(),
                message: "injected fetch failure".into(),
            });
        }
        Ok(coll.records.clone())
    }

    async fn watch(&self, collection: &str) -> Result<ChangeStream> {
        let mut collections = lock(&self.collections);
        let Some(coll) = collections.get_mut(collection) else {
            return Err(SyncError::Watch {
                collection: collection.to_string(),
                message: "no such collection".into(),
            });
        };
        coll.watches += 1;

        let name = collection.to_string();
        let stream = BroadcastStream::new(coll.events.subscribe()).map(move |item| {
            // A lagged receiver still means "something changed".
            Ok::<_, SyncError>(item.unwrap_or_else(|_| ChangeEvent::new(name.clone())))
        });
        Ok(stream.boxed())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TabLog {
    writes: Vec<SheetGrid>,
    attempts: usize,
    in_flight: usize,
    max_in_flight: usize,
    fail_always: Option<bool>,
    fail_next: u32,
}

/// Sink that records every grid written, per tab.
#[derive(Default)]
pub struct RecordingSink {
    tabs: Mutex<HashMap<String, TabLog>>,
    delay: Option<Duration>,
    written: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every write open for `delay`, to make overlap observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every write to `tab` with the given retry classification.
    pub fn fail_tab(&self, tab: &str, retryable: bool) {
        lock(&self.tabs).entry(tab.to_string()).or_default().fail_always = Some(retryable);
    }

    /// Fail the next `count` writes to `tab` with a retryable error.
    pub fn fail_next(&self, tab: &str, count: u32) {
        lock(&self.tabs).entry(tab.to_string()).or_default().fail_next = count;
    }

    /// Successful writes to `tab`, oldest first.
    pub fn writes_for(&self, tab: &str) -> Vec<SheetGrid> {
        lock(&self.tabs)
            .get(tab)
            .map(|t| t.writes.clone())
            .unwrap_or_default()
    }

    /// Names of every tab that received at least one successful write.
    pub fn written_tabs(&self) -> Vec<String> {
        let mut tabs: Vec<_> = lock(&self.tabs)
            .iter()
            .filter(|(_, t)| !t.writes.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        tabs.sort();
        tabs
    }

    /// Write calls for `tab`, failed ones included.
    pub fn attempts(&self, tab: &str) -> usize {
        lock(&self.tabs).get(tab).map(|t| t.attempts).unwrap_or(0)
    }

    /// Highest number of simultaneous writes seen on `tab`.
    pub fn max_in_flight(&self, tab: &str) -> usize {
        lock(&self.tabs).get(tab).map(|t| t.max_in_flight).unwrap_or(0)
    }

    /// Wait until `tab` has at least `count` successful writes, or `within`
    /// elapses. Returns whether the count was reached.
    pub async fn wait_for_writes(&self, tab: &str, count: usize, within: Duration) -> bool {
        tokio::time::timeout(within, async {
            loop {
                let notified = self.written.notified();
                if self.writes_for(tab).len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }

    fn begin(&self, tab: &str) -> Result<()> {
        let mut tabs = lock(&self.tabs);
        let log = tabs.entry(tab.to_string()).or_default();
        log.attempts += 1;

        let failure = if let Some(retryable) = log.fail_always {
            Some(retryable)
        } else if log.fail_next > 0 {
            log.fail_next -= 1;
            Some(true)
        } else {
            None
        };
        if let Some(retryable) = failure {
            return Err(SyncError::SinkWrite {
                tab: tab.to_string(),
                message: "injected write failure".into(),
                retryable,
            });
        }

        log.in_flight += 1;
        log.max_in_flight = log.max_in_flight.max(log.in_flight);
        Ok(())
    }

    fn finish(&self, tab: &str, grid: &SheetGrid) {
        let mut tabs = lock(&self.tabs);
        let log = tabs.entry(tab.to_string()).or_default();
        log.in_flight -= 1;
        log.writes.push(grid.clone());
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn write_grid(&self, tab: &str, grid: &SheetGrid) -> Result<()> {
        self.begin(tab)?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.finish(tab, grid);
        self.written.notify_waiters();
        Ok(())
    }
}
