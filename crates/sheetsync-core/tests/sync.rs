use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sheetsync_core::config::{Settings, SubscriberSettings};
use sheetsync_core::memory::{MemorySource, RecordingSink};
use sheetsync_core::retry::RetryPolicy;
use sheetsync_core::status::WatchState;
use sheetsync_core::{Coordinator, Record, SheetGrid, SyncContext};

const WAIT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings() -> Settings {
    Settings {
        retry: RetryPolicy {
            timeout_secs: 5,
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
        },
        subscriber: SubscriberSettings {
            reconnect_base_ms: 5,
            reconnect_max_ms: 20,
            ..SubscriberSettings::default()
        },
        ..Settings::default()
    }
}

fn coordinator(source: &Arc<MemorySource>, sink: &Arc<RecordingSink>) -> Coordinator {
    Coordinator::new(SyncContext::new(source.clone(), sink.clone(), settings()))
}

fn user(id: i64, name: &str) -> Record {
    Record::new().with("id", id).with("name", name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn startup_exports_every_collection() {
    let source = Arc::new(
        MemorySource::new()
            .with_collection("users", vec![user(1, "A"), user(2, "B")])
            .with_collection("logs", vec![]),
    );
    let sink = Arc::new(RecordingSink::new());
    let _handle = coordinator(&source, &sink).start().await.unwrap();

    let users = sink.writes_for("users");
    assert_eq!(users.len(), 1);
    assert_eq!(
        serde_json::to_value(&users[0]).unwrap(),
        json!([["id", "name"], [1, "A"], [2, "B"]])
    );
    assert_eq!(sink.writes_for("logs"), vec![SheetGrid::no_data()]);
}

#[tokio::test]
async fn change_event_rewrites_with_post_event_data() {
    let source = Arc::new(MemorySource::new().with_collection("users", vec![user(1, "A")]));
    let sink = Arc::new(RecordingSink::new());
    let _handle = coordinator(&source, &sink).start().await.unwrap();

    source.insert("users", user(2, "B"));
    assert!(sink.wait_for_writes("users", 2, WAIT).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let writes = sink.writes_for("users");
    assert_eq!(writes.len(), 2, "exactly one export per event");
    assert_eq!(writes[0].body().len(), 1);
    assert_eq!(
        serde_json::to_value(&writes[1]).unwrap(),
        json!([["id", "name"], [1, "A"], [2, "B"]])
    );
}

#[tokio::test]
async fn failing_collection_does_not_block_others() {
    let source = Arc::new(
        MemorySource::new()
            .with_collection("alpha", vec![user(1, "A")])
            .with_collection("beta", vec![user(2, "B")]),
    );
    let sink = Arc::new(RecordingSink::new());
    sink.fail_tab("alpha", false);
    let coordinator = coordinator(&source, &sink);
    let _handle = coordinator.start().await.unwrap();

    assert!(sink.writes_for("alpha").is_empty());
    assert_eq!(sink.writes_for("beta").len(), 1);

    // Events keep flowing for the healthy collection.
    source.insert("beta", user(3, "C"));
    assert!(sink.wait_for_writes("beta", 2, WAIT).await);

    let status = coordinator.context().status.snapshot();
    assert_eq!(status.collections["alpha"].exports_failed, 1);
    assert_eq!(status.collections["beta"].exports_ok, 2);
}

#[tokio::test]
async fn collections_created_after_startup_are_ignored() {
    let source = Arc::new(MemorySource::new().with_collection("users", vec![]));
    let sink = Arc::new(RecordingSink::new());
    let handle = coordinator(&source, &sink).start().await.unwrap();
    assert_eq!(handle.collections(), ["users".to_string()]);

    source.create_collection("late");
    source.insert("late", user(1, "A"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(sink.writes_for("late").is_empty());
    assert_eq!(source.watch_count("late"), 0);
}

#[tokio::test]
async fn shrinking_collection_rewrites_from_a1() {
    let source = Arc::new(
        MemorySource::new().with_collection("users", vec![user(1, "A"), user(2, "B")]),
    );
    let sink = Arc::new(RecordingSink::new());
    let _handle = coordinator(&source, &sink).start().await.unwrap();

    source.replace_all("users", vec![]);
    assert!(sink.wait_for_writes("users", 2, WAIT).await);
    assert!(sink.writes_for("users")[1].is_no_data());
}

#[tokio::test]
async fn subscriber_reconnects_after_stream_drop() {
    let source = Arc::new(MemorySource::new().with_collection("users", vec![user(1, "A")]));
    let sink = Arc::new(RecordingSink::new());
    let coordinator = coordinator(&source, &sink);
    let _handle = coordinator.start().await.unwrap();

    source.close_streams("users");
    assert!(sink.wait_for_writes("users", 2, WAIT).await, "catch-up export");

    source.insert("users", user(2, "B"));
    assert!(sink.wait_for_writes("users", 3, WAIT).await);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let users = coordinator.context().status.collection("users").unwrap();
    assert_eq!(users.reconnects, 1);
    assert_eq!(users.state, Some(WatchState::Watching));
}
