//! Error types for transport operations

use bytes::Bytes;

/// Errors surfaced once the retry loop gives up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("HTTP request timed out: {0}")]
    Timeout(String),

    /// The last response still had a retryable status. Its body is kept so
    /// callers can classify an error payload the server attached.
    #[error("upstream returned {status} after {attempts} attempts")]
    RetriesExhausted {
        status: u16,
        attempts: u32,
        body: Bytes,
    },
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;
