use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use sheetsync_core::config::SyncConfig;
use sheetsync_core::status::StartupPhase;
use sheetsync_core::{Coordinator, SyncStatus};
use tracing::{error, info};

/// Long-lived sync: initial export, then re-export on every change until
/// Ctrl-C.
pub fn run(config_path: Option<&Path>, port: Option<u16>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let port = port.or(config.settings.health_port);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_sync(config, port))
}

async fn run_sync(config: SyncConfig, port: Option<u16>) -> Result<()> {
    let status = Arc::new(SyncStatus::new());

    // Liveness comes up before the source connects and stays up regardless
    // of sync state.
    if let Some(port) = port {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let status = status.clone();
        tokio::spawn(async move {
            if let Err(e) = sheetsync_server::serve_on(status, listener).await {
                error!(error = %e, "health server stopped");
            }
        });
    }

    let ctx = match super::connect(&config, status.clone()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            status.set_phase(StartupPhase::Failed {
                error: format!("{e:#}"),
            });
            return Err(e);
        }
    };
    let coordinator = Coordinator::new(ctx);

    tokio::select! {
        result = coordinator.run() => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C, shutting down");
            Ok(())
        }
    }
}
