use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::export::{ExportOutcome, Exporter};
use crate::status::{StartupPhase, WatchState};
use crate::subscriber::Subscriber;

/// Running subscriptions, one task per collection discovered at startup.
///
/// Dropping the handle aborts every subscriber.
pub struct SyncHandle {
    collections: Vec<String>,
    tasks: JoinSet<()>,
}

impl SyncHandle {
    /// Collections being watched, in enumeration order.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// Wait for every subscriber to stop. With reconnect enabled this only
    /// happens when a reconnect budget runs out.
    pub async fn wait(mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!(error = %e, "change subscriber panicked");
                }
            }
        }
    }

    pub fn abort(&mut self) {
        self.tasks.abort_all();
    }
}

/// Startup orchestration: discover, export everything once, then watch.
pub struct Coordinator {
    exporter: Arc<Exporter>,
}

impl Coordinator {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            exporter: Arc::new(Exporter::new(Arc::new(ctx))),
        }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        self.exporter.context()
    }

    pub fn exporter(&self) -> &Arc<Exporter> {
        &self.exporter
    }

    /// List collections, retrying transient failures. Anything that still
    /// fails is reported as `SourceUnavailable`.
    pub async fn discover(&self) -> Result<Vec<String>> {
        let ctx = self.context();
        ctx.settings
            .retry
            .run("list collections", || ctx.source.list_collections())
            .await
            .map_err(|e| match e {
                SyncError::SourceUnavailable(_) => e,
                other => SyncError::SourceUnavailable(other.to_string()),
            })
    }

    /// Export every collection once, sequentially, in enumeration order.
    pub async fn initial_sync(&self) -> Result<Vec<(String, ExportOutcome)>> {
        let collections = self.discover().await?;
        info!(count = collections.len(), "connected to source, initializing sheets");

        let mut outcomes = Vec::with_capacity(collections.len());
        for name in collections {
            let outcome = self.exporter.export(&name).await;
            outcomes.push((name, outcome));
        }
        Ok(outcomes)
    }

    /// Initial sync, then one subscriber per collection.
    ///
    /// Every change stream is opened before this returns, so any mutation
    /// made after `start` resolves is seen. Collections created later are
    /// never picked up.
    pub async fn start(&self) -> Result<SyncHandle> {
        let status = self.context().status.clone();
        status.set_phase(StartupPhase::Starting);

        match self.start_watching().await {
            Ok(handle) => {
                status.set_phase(StartupPhase::Running);
                Ok(handle)
            }
            Err(e) => {
                status.set_phase(StartupPhase::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn start_watching(&self) -> Result<SyncHandle> {
        let outcomes = self.initial_sync().await?;
        let failed = outcomes.iter().filter(|(_, o)| !o.is_written()).count();
        if failed > 0 {
            warn!(failed, "initial sync finished with failures");
        }

        let collections = self.discover().await?;
        info!(collections = %collections.join(", "), "listening for changes");

        let ctx = self.context();
        let mut tasks = JoinSet::new();
        for name in &collections {
            ctx.status.set_state(name, WatchState::Idle);
            let opened = ctx.source.watch(name).await;
            let subscriber = Subscriber::new(name.clone(), self.exporter.clone());
            tasks.spawn(subscriber.run(opened));
        }

        Ok(SyncHandle { collections, tasks })
    }

    /// Start and keep running. Returns only on startup failure.
    pub async fn run(&self) -> Result<()> {
        let handle = self.start().await?;
        handle.wait().await;
        warn!("all change subscriptions closed; idling");
        std::future::pending::<()>().await;
        Ok(())
    }
}
