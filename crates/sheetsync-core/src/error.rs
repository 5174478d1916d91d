use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("failed to fetch records from '{collection}': {message}")]
    Fetch { collection: String, message: String },

    #[error("failed to write tab '{tab}': {message}")]
    SinkWrite {
        tab: String,
        message: String,
        retryable: bool,
    },

    #[error("failed to watch '{collection}': {message}")]
    Watch { collection: String, message: String },

    #[error("change stream closed for '{0}'")]
    StreamClosed(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether another attempt at the same operation may succeed.
    ///
    /// Sink errors carry their own classification (quota and 5xx are
    /// transient, auth and bad ranges are not). Fetches, watches and
    /// timeouts are always worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::SinkWrite { retryable, .. } => *retryable,
            SyncError::Fetch { .. }
            | SyncError::Watch { .. }
            | SyncError::StreamClosed(_)
            | SyncError::Timeout { .. }
            | SyncError::SourceUnavailable(_) => true,
            SyncError::Credentials(_)
            | SyncError::Config(_)
            | SyncError::Io(_)
            | SyncError::Yaml(_)
            | SyncError::Json(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_write_uses_its_own_flag() {
        let transient = SyncError::SinkWrite {
            tab: "users".into(),
            message: "429".into(),
            retryable: true,
        };
        let permanent = SyncError::SinkWrite {
            tab: "users".into(),
            message: "401".into(),
            retryable: false,
        };
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn fetch_is_retryable() {
        let err = SyncError::Fetch {
            collection: "users".into(),
            message: "connection reset".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn credentials_are_not_retryable() {
        assert!(!SyncError::Credentials("bad key".into()).is_retryable());
    }

    #[test]
    fn display_names_the_tab() {
        let err = SyncError::SinkWrite {
            tab: "logs".into(),
            message: "quota exceeded".into(),
            retryable: true,
        };
        assert_eq!(err.to_string(), "failed to write tab 'logs': quota exceeded");
    }
}
