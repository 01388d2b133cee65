//! Client error types

use thiserror::Error;

/// Client error type
///
/// Nothing here is treated as process-fatal; the worst outcome is a stale
/// or unauthenticated UI state, recoverable by re-login or reconnect.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Channel absent when a command was attempted
    #[error("Not connected to the event channel")]
    NotConnected,

    /// No ack arrived within the timeout budget
    #[error("Command timed out")]
    Timeout,

    /// Ack arrived with ok:false, carries the server message
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// Cached data belongs to a restaurant that is no longer current.
    /// Handled internally by the reference cache; surfaces only when the
    /// follow-up refetch itself fails.
    #[error("Cached data belongs to a stale restaurant")]
    StaleTenant,

    /// Secure/local storage read or write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Transport-level failure (dial, framing, closed stream)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed frame or payload
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
