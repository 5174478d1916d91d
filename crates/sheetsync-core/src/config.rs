use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Environment variable names
// ---------------------------------------------------------------------------

pub const ENV_MONGO_URI: &str = "MONGO_URI";
pub const ENV_DATABASE_NAME: &str = "DATABASE_NAME";
pub const ENV_SHEET_ID: &str = "SHEET_ID";
pub const ENV_ACCESS_TOKEN: &str = "SHEETSYNC_ACCESS_TOKEN";
pub const ENV_KEY_FILE: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_GOOGLE_TYPE: &str = "GOOGLE_TYPE";
pub const ENV_GOOGLE_PROJECT_ID: &str = "GOOGLE_PROJECT_ID";
pub const ENV_GOOGLE_PRIVATE_KEY_ID: &str = "GOOGLE_PRIVATE_KEY_ID";
pub const ENV_GOOGLE_PRIVATE_KEY: &str = "GOOGLE_PRIVATE_KEY";
pub const ENV_GOOGLE_CLIENT_EMAIL: &str = "GOOGLE_CLIENT_EMAIL";
pub const ENV_GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

// ---------------------------------------------------------------------------
// SubscriberSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberSettings {
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Consecutive failed reopen attempts before giving up. `None` retries forever.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
    /// Coalescing window for bursts of events. 0 disables coalescing.
    #[serde(default)]
    pub debounce_ms: u64,
}

fn default_reconnect() -> bool {
    true
}

fn default_reconnect_base_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    60_000
}

impl Default for SubscriberSettings {
    fn default() -> Self {
        Self {
            reconnect: default_reconnect(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            max_reconnect_attempts: None,
            debounce_ms: 0,
        }
    }
}

impl SubscriberSettings {
    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }

    /// Backoff before reopen attempt `attempt` (0-based), capped at `reconnect_max_ms`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        let ms = self
            .reconnect_base_ms
            .saturating_mul(factor)
            .min(self.reconnect_max_ms);
        Duration::from_millis(ms)
    }
}

// ---------------------------------------------------------------------------
// SheetsSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetsSettings {
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
    /// Overrides the token URI from the service-account key.
    #[serde(default)]
    pub token_url: Option<String>,
}

fn default_sheets_base_url() -> String {
    DEFAULT_SHEETS_BASE_URL.to_string()
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            base_url: default_sheets_base_url(),
            token_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings (YAML tuning file)
// ---------------------------------------------------------------------------

/// Tuning knobs read from an optional YAML file. Every field has a default,
/// so an empty file (or no file) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub subscriber: SubscriberSettings,
    #[serde(default)]
    pub sheets: SheetsSettings,
    #[serde(default)]
    pub health_port: Option<u16>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceAccountKey
// ---------------------------------------------------------------------------

/// Google service-account key, in the shape of the downloadable JSON key file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default = "default_key_type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_key_type() -> String {
    "service_account".to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json)?;
        key.validate()?;
        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Credentials(format!("cannot read key file {}: {e}", path.display()))
        })?;
        Self::from_json(&data)
    }

    fn validate(&self) -> Result<()> {
        if self.private_key.trim().is_empty() {
            return Err(SyncError::Credentials("private_key is empty".into()));
        }
        if self.client_email.trim().is_empty() {
            return Err(SyncError::Credentials("client_email is empty".into()));
        }
        Ok(())
    }
}

/// How the Sheets client authenticates.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    /// Pre-issued bearer token, used as-is.
    AccessToken(String),
}

// ---------------------------------------------------------------------------
// SourceConfig / SheetsConfig / SyncConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub credentials: Credentials,
}

/// Everything the process needs, assembled once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub source: SourceConfig,
    pub sheets: SheetsConfig,
    pub settings: Settings,
}

/// Read a variable through `lookup`, treating blank values as unset.
fn var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    var(lookup, name).ok_or_else(|| SyncError::Config(format!("{name} is not set")))
}

/// Process environment as a lookup function.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl SourceConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            uri: required(&lookup, ENV_MONGO_URI)?,
            database: required(&lookup, ENV_DATABASE_NAME)?,
        })
    }
}

impl SheetsConfig {
    /// Credentials are taken from, in order: `SHEETSYNC_ACCESS_TOKEN`,
    /// the key file named by `GOOGLE_APPLICATION_CREDENTIALS`, then the
    /// individual `GOOGLE_*` fields.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let spreadsheet_id = required(&lookup, ENV_SHEET_ID)?;

        let credentials = if let Some(token) = var(&lookup, ENV_ACCESS_TOKEN) {
            Credentials::AccessToken(token)
        } else if let Some(path) = var(&lookup, ENV_KEY_FILE) {
            Credentials::ServiceAccount(ServiceAccountKey::from_file(&PathBuf::from(path))?)
        } else {
            let private_key = required(&lookup, ENV_GOOGLE_PRIVATE_KEY)?;
            let key = ServiceAccountKey {
                key_type: var(&lookup, ENV_GOOGLE_TYPE).unwrap_or_else(default_key_type),
                project_id: var(&lookup, ENV_GOOGLE_PROJECT_ID).unwrap_or_default(),
                private_key_id: var(&lookup, ENV_GOOGLE_PRIVATE_KEY_ID).unwrap_or_default(),
                // Keys pasted into env files usually carry literal "\n".
                private_key: private_key.replace("\\n", "\n"),
                client_email: required(&lookup, ENV_GOOGLE_CLIENT_EMAIL)?,
                client_id: var(&lookup, ENV_GOOGLE_CLIENT_ID).unwrap_or_default(),
                token_uri: default_token_uri(),
            };
            key.validate()?;
            Credentials::ServiceAccount(key)
        };

        Ok(Self {
            spreadsheet_id,
            credentials,
        })
    }
}

impl SyncConfig {
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        settings: Settings,
    ) -> Result<Self> {
        Ok(Self {
            source: SourceConfig::from_lookup(&lookup)?,
            sheets: SheetsConfig::from_lookup(&lookup)?,
            settings,
        })
    }

    pub fn from_env(settings: Settings) -> Result<Self> {
        Self::from_lookup(process_env, settings)
    }
}
