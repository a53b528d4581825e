//! Unified error types for the collector.
//!
//! Error codes:
//! - SINK_001-002: Metrics store errors
//! - SRV_001-002: Media server errors
//! - POINT_001: Point construction errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the collector.
#[derive(Debug, Error)]
pub enum Error {
    /// The target database does not exist yet. Recoverable by creating it.
    #[error("[SINK_001] database not found: {0}")]
    DatabaseNotFound(String),

    #[error("[SINK_002] sink error: {0}")]
    Sink(String),

    #[error("[SRV_001] media server error ({host}): {message}")]
    Server { host: String, message: String },

    #[error("[SRV_002] authentication failed: {0}")]
    Auth(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("[POINT_001] invalid point: {0}")]
    InvalidPoint(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn database_not_found(database: impl Into<String>) -> Self {
        Self::DatabaseNotFound(database.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a media server error tagged with the failing host.
    pub fn server(host: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Server {
            host: host.into(),
            message: msg.into(),
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn invalid_point(msg: impl Into<String>) -> Self {
        Self::InvalidPoint(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the sink reported a missing database.
    pub fn is_database_not_found(&self) -> bool {
        matches!(self, Self::DatabaseNotFound(_))
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseNotFound(_) => Some("SINK_001"),
            Self::Sink(_) => Some("SINK_002"),
            Self::Server { .. } => Some("SRV_001"),
            Self::Auth(_) => Some("SRV_002"),
            Self::InvalidPoint(_) => Some("POINT_001"),
            _ => None,
        }
    }
}
