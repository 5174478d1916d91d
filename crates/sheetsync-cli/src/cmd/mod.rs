pub mod collections;
pub mod export;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mongo_source::MongoSource;
use sheets_client::SheetsClient;
use sheetsync_core::config::{Settings, SyncConfig};
use sheetsync_core::{SyncContext, SyncStatus};

/// Tuning file plus environment, validated before anything connects.
pub fn load_config(config_path: Option<&Path>) -> Result<SyncConfig> {
    let settings = Settings::load_or_default(config_path).with_context(|| match config_path {
        Some(path) => format!("loading {}", path.display()),
        None => "loading settings".to_string(),
    })?;
    Ok(SyncConfig::from_env(settings)?)
}

/// Build the Sheets sink, then connect to MongoDB. Credential problems
/// surface before any network round-trip.
pub async fn connect(config: &SyncConfig, status: Arc<SyncStatus>) -> Result<SyncContext> {
    let sink = SheetsClient::from_config(&config.sheets, &config.settings.sheets)?;
    let source = MongoSource::connect(&config.source.uri, &config.source.database).await?;
    Ok(
        SyncContext::new(Arc::new(source), Arc::new(sink), config.settings.clone())
            .with_status(status),
    )
}
