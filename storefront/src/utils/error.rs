//! Unified error handling for the engine.

use platform_client::ClientError;

/// Application error enum.
///
/// Platform fetch failures are generally absorbed by the derived-data cache
/// and the hours gate (degraded cached results); the variants here surface
/// only where an operation genuinely cannot proceed, such as order
/// submission.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Remote platform call failed
    #[error("Platform error: {0}")]
    Platform(#[from] ClientError),

    /// Local key-value storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Selection is not complete; names the first blocking attribute
    #[error("Selection incomplete: missing {attribute}")]
    Incomplete { attribute: String },

    /// Order submission was rejected by the daily gate
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Serialization of persisted data failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<redb::Error> for AppError {
    fn from(e: redb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
