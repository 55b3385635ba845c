//! Error types for fetch cache operations

use std::fmt;

use thiserror::Error;

/// Failure reported by the transport collaborator.
///
/// The cache never inspects or retries these; they are stored on the entry and
/// handed to every waiter of the failed fetch exactly as produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    status: Option<u16>,
}

impl TransportError {
    /// Create a transport error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Attach a protocol status code (e.g. an HTTP status)
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The status code, if the transport provided one
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

/// Why a single caller stopped waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The caller invoked `cancel()` or dropped its request
    Caller,
    /// The caller's deadline elapsed
    Timeout,
}

impl CancelReason {
    /// Get reason as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::Caller => "caller",
            CancelReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for all fetch cache operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Transport call failed; shared by every waiter of that fetch
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// This caller cancelled or timed out; never stored on the entry
    #[error("request cancelled ({0})")]
    Cancelled(CancelReason),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Check if this error only concerns the caller that received it
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CacheError::Cancelled(_))
    }

    /// Check if the caller gave up because of its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, CacheError::Cancelled(CancelReason::Timeout))
    }

    /// Get the transport error, if this is one
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            CacheError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for fetch cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
