//! Error types for ad-gate.

/// Configuration-related errors. Fatal at startup — the process must
/// not begin polling with a broken config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Transport-layer errors — Bot API calls, membership queries, publishing.
///
/// These are recovered locally: a failed membership query becomes a
/// retryable deny verdict, a failed publish becomes a transient-failure
/// reply. They never crash the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Bot API call {method} failed: {detail}")]
    Api { method: String, detail: String },

    #[error("Publish to channel failed: {0}")]
    PublishFailed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}
