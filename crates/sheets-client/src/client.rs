use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use sheetsync_core::config::{Credentials, SheetsConfig, SheetsSettings};
use sheetsync_core::grid::range_for;
use sheetsync_core::{SheetGrid, Sink};
use tracing::debug;

use crate::auth::{ServiceAccountAuth, StaticToken, TokenProvider};
use crate::error::SheetsError;
use crate::types::{error_message, UpdateValuesResponse, ValueRange};

/// Writes grids into the tabs of one spreadsheet through the v4 values API.
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: sheetsync_core::config::DEFAULT_SHEETS_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build a client from startup configuration, choosing the token
    /// provider from the configured credentials.
    pub fn from_config(
        config: &SheetsConfig,
        settings: &SheetsSettings,
    ) -> Result<Self, SheetsError> {
        let http = reqwest::Client::new();
        let tokens: Arc<dyn TokenProvider> = match &config.credentials {
            Credentials::AccessToken(token) => Arc::new(StaticToken::new(token.clone())),
            Credentials::ServiceAccount(key) => {
                let mut auth = ServiceAccountAuth::new(key.clone(), http.clone())?;
                if let Some(url) = &settings.token_url {
                    auth = auth.with_token_url(url.clone());
                }
                Arc::new(auth)
            }
        };
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            tokens,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}` with each segment
    /// percent-encoded, so tab names with spaces or slashes stay one segment.
    fn values_url(&self, range: &str) -> Result<Url, SheetsError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| SheetsError::Url(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    /// Overwrite `range` with `grid`, values stored exactly as given.
    pub async fn update_values(
        &self,
        range: &str,
        grid: &SheetGrid,
    ) -> Result<UpdateValuesResponse, SheetsError> {
        let url = self.values_url(range)?;
        let token = self.tokens.access_token().await?;

        let resp = self
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(token)
            .json(&ValueRange::rows(range, grid))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(UpdateValuesResponse::default());
        }
        serde_json::from_str(&body).map_err(|e| SheetsError::Api {
            status: status.as_u16(),
            message: format!("unreadable response: {e}"),
        })
    }
}

#[async_trait]
impl Sink for SheetsClient {
    async fn write_grid(&self, tab: &str, grid: &SheetGrid) -> sheetsync_core::Result<()> {
        let range = range_for(tab);
        let resp = self
            .update_values(&range, grid)
            .await
            .map_err(|e| e.into_sink_error(tab))?;
        debug!(
            tab,
            updated_range = resp.updated_range.as_deref().unwrap_or(""),
            updated_cells = resp.updated_cells.unwrap_or(0),
            "values updated"
        );
        Ok(())
    }
}
