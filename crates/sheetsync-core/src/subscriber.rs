use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SyncError};
use crate::export::Exporter;
use crate::source::ChangeStream;
use crate::status::WatchState;

/// Why a change stream stopped delivering events.
#[derive(Debug)]
enum StreamEnd {
    Closed,
    Failed(SyncError),
}

impl std::fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnd::Closed => write!(f, "stream ended"),
            StreamEnd::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// Change subscriber for one collection.
///
/// ```text
/// Idle ──open──▶ Watching ──event──▶ Triggering ──export done──▶ Watching
///                   │
///                 drop/err
///                   ▼
///                 Closed ──backoff──▶ Idle   (when reconnect is enabled)
/// ```
///
/// Events are consumed one at a time: the next event is not read until the
/// export triggered by the previous one has finished or failed.
pub struct Subscriber {
    collection: String,
    exporter: Arc<Exporter>,
}

impl Subscriber {
    pub fn new(collection: impl Into<String>, exporter: Arc<Exporter>) -> Self {
        Self {
            collection: collection.into(),
            exporter,
        }
    }

    fn set_state(&self, state: WatchState) {
        self.exporter
            .context()
            .status
            .set_state(&self.collection, state);
    }

    /// Drive the subscription until it is closed for good.
    ///
    /// `opened` is the result of the first `watch` call, made by the
    /// coordinator so no event between startup and this task being polled is
    /// lost. Returns only when reconnecting is disabled or the reconnect
    /// budget is exhausted.
    pub async fn run(self, opened: Result<ChangeStream>) {
        let ctx = self.exporter.context().clone();
        let settings = &ctx.settings.subscriber;
        let collection = self.collection.as_str();

        let mut opened = opened;
        let mut failed_opens: u32 = 0;
        let mut catch_up = false;

        loop {
            match opened {
                Ok(stream) => {
                    if catch_up {
                        // Events may have been missed while disconnected.
                        ctx.status.record_reconnect(collection);
                        info!(collection, "change stream reopened, re-exporting");
                        self.set_state(WatchState::Triggering);
                        self.exporter.export(collection).await;
                    }
                    self.set_state(WatchState::Watching);
                    let (delivered, end) = self.consume(stream).await;
                    self.set_state(WatchState::Closed);
                    // A stream that dies before its first event counts
                    // against the reconnect budget like a failed open.
                    if delivered > 0 {
                        failed_opens = 0;
                    } else {
                        failed_opens += 1;
                    }
                    warn!(collection, reason = %end, events = delivered, "change stream closed");
                }
                Err(e) => {
                    failed_opens += 1;
                    self.set_state(WatchState::Closed);
                    warn!(collection, error = %e, attempt = failed_opens, "failed to open change stream");
                }
            }
            catch_up = true;

            if !settings.reconnect {
                info!(collection, "reconnect disabled, no longer watching");
                return;
            }
            if let Some(max) = settings.max_reconnect_attempts {
                if failed_opens >= max {
                    error!(collection, attempts = failed_opens, "giving up on change stream");
                    return;
                }
            }

            let delay = settings.reconnect_delay(failed_opens.saturating_sub(1));
            debug!(collection, delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::time::sleep(delay).await;

            self.set_state(WatchState::Idle);
            opened = ctx.source.watch(collection).await;
        }
    }

    /// Read events until the stream ends, exporting once per event (or once
    /// per coalesced burst when a debounce window is configured). Returns
    /// how many events were delivered and why the stream ended.
    async fn consume(&self, mut stream: ChangeStream) -> (u64, StreamEnd) {
        let debounce = self.exporter.context().settings.subscriber.debounce();
        let collection = self.collection.as_str();
        let mut delivered = 0;

        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => return (delivered, StreamEnd::Failed(e)),
            };
            delivered += 1;
            info!(
                collection,
                operation = event.operation.as_deref().unwrap_or("unknown"),
                document = event.document_key.as_deref().unwrap_or("-"),
                "change detected"
            );

            let mut ended = None;
            if let Some(window) = debounce {
                let (coalesced, end) = drain_window(&mut stream, window).await;
                delivered += u64::from(coalesced);
                if coalesced > 0 {
                    debug!(collection, coalesced, "coalesced change events");
                }
                ended = end;
            }

            self.set_state(WatchState::Triggering);
            self.exporter.export(collection).await;
            self.set_state(WatchState::Watching);

            if let Some(end) = ended {
                return (delivered, end);
            }
        }
        (delivered, StreamEnd::Closed)
    }
}

/// Swallow events arriving within `window` of now. Returns how many were
/// absorbed and, if the stream ended meanwhile, why.
async fn drain_window(stream: &mut ChangeStream, window: Duration) -> (u32, Option<StreamEnd>) {
    let deadline = Instant::now() + window;
    let mut coalesced = 0;
    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Err(_) => return (coalesced, None),
            Ok(Some(Ok(_))) => coalesced += 1,
            Ok(Some(Err(e))) => return (coalesced, Some(StreamEnd::Failed(e))),
            Ok(None) => return (coalesced, Some(StreamEnd::Closed)),
        }
    }
}
