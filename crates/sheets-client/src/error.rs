use sheetsync_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("token endpoint returned {status}: {message}")]
    Token { status: u16, message: String },

    #[error("Failed to sign token assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Invalid URL: {0}")]
    Url(String),
}

/// Quota (429) and server-side (5xx) failures are transient.
fn transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

impl SheetsError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SheetsError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().map(|s| transient_status(s.as_u16())).unwrap_or(false)
            }
            SheetsError::Api { status, .. } | SheetsError::Token { status, .. } => {
                transient_status(*status)
            }
            SheetsError::Jwt(_) | SheetsError::Credentials(_) | SheetsError::Url(_) => false,
        }
    }

    /// Map into the core taxonomy as a failed write to `tab`.
    pub fn into_sink_error(self, tab: &str) -> SyncError {
        SyncError::SinkWrite {
            tab: tab.to_string(),
            retryable: self.is_retryable(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> SheetsError {
        SheetsError::Api {
            status,
            message: "x".into(),
        }
    }

    #[test]
    fn quota_and_server_errors_are_retryable() {
        assert!(api(429).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
    }

    #[test]
    fn auth_and_range_errors_are_permanent() {
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(403).is_retryable());
        assert!(!SheetsError::Credentials("bad pem".into()).is_retryable());
    }

    #[test]
    fn sink_error_keeps_classification() {
        let err = api(429).into_sink_error("users");
        match err {
            SyncError::SinkWrite {
                tab,
                retryable,
                message,
            } => {
                assert_eq!(tab, "users");
                assert!(retryable);
                assert!(message.contains("429"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
