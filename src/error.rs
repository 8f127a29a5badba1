//! Error types for Event Socket operations.
//!
//! All fallible operations in this crate return [`EslResult<T>`]. Command
//! failures reported by the server (`-ERR` replies) are *not* errors — the
//! reply [`Packet`](crate::Packet) comes back as a value and callers inspect
//! [`success()`](crate::Packet::success). Errors here mean the request could
//! not complete at all: the transport is down, authentication failed, or the
//! engine has stopped.

use crate::connection::StopReason;
use thiserror::Error;

/// Result type alias for Event Socket operations
pub type EslResult<T> = Result<T, EslError>;

/// Errors surfaced by the connection engine and client handles
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EslError {
    /// IO error from the underlying TCP session
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine is not in the connected state
    #[error("not connected to the event socket")]
    NotConnected,

    /// The session was lost while a request was outstanding
    #[error("connection closed")]
    ConnectionClosed,

    /// The server rejected the `auth` command, or sent an unexpected
    /// packet during the handshake
    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The engine reached a terminal state and no longer accepts requests
    #[error("engine stopped: {reason}")]
    Stopped { reason: StopReason },

    /// Malformed data that could not be handled best-effort
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Failure decoding a `text/event-json` body
    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EslError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            reason: reason.into(),
        }
    }

    /// `true` if the TCP session is gone and the request may succeed after
    /// the engine reconnects.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            EslError::Io(_) | EslError::NotConnected | EslError::ConnectionClosed
        )
    }

    /// `true` if the engine has stopped for good and no retry will help.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EslError::Stopped { .. } | EslError::AuthenticationFailed { .. }
        )
    }
}
