use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use sheetsync_core::config::ServiceAccountKey;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SheetsError;
use crate::types::{Claims, TokenErrorBody, TokenResponse};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the cached token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for Sheets requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SheetsError>;
}

// ─── StaticToken ──────────────────────────────────────────────────────────

/// A pre-issued token, returned unchanged on every call.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SheetsError> {
        Ok(self.0.clone())
    }
}

// ─── ServiceAccountAuth ───────────────────────────────────────────────────

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// OAuth2 JWT-bearer flow for a service account.
///
/// A signed assertion is exchanged at the token endpoint for an access
/// token, which is cached until shortly before it expires.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token_url: String,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Fails when the private key is not a parseable RSA PEM.
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, SheetsError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("private_key: {e}")))?;
        let token_url = key.token_uri.clone();
        Ok(Self {
            key,
            encoding_key,
            token_url,
            http,
            cached: RwLock::new(None),
        })
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn claims(&self, now: DateTime<Utc>) -> Claims {
        let iat = now.timestamp();
        Claims {
            iss: self.key.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.token_url.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, SheetsError> {
        let mut header = Header::new(Algorithm::RS256);
        if !self.key.private_key_id.is_empty() {
            header.kid = Some(self.key.private_key_id.clone());
        }
        Ok(jsonwebtoken::encode(
            &header,
            &self.claims(now),
            &self.encoding_key,
        )?)
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken, SheetsError> {
        let assertion = self.assertion(now)?;
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {desc}", err.error),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(SheetsError::Token {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = resp.json().await?;
        debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained access token"
        );
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, SheetsError> {
        let now = Utc::now();
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh(now) {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.token.clone());
            }
        }
        let fresh = self.fetch_token(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
