//! Typed error handling for delivery operations.
//!
//! This module provides structured error types that distinguish between:
//! - Permanent failures (5xx SMTP codes, unusable addresses)
//! - Temporary failures (4xx SMTP codes, connection problems)
//! - System errors (message construction, configuration)
//!
//! The worker counts every kind the same way against the retry budget; the
//! categories exist for logging and for transports that want to short-circuit.

use thiserror::Error;

/// Per-receiver delivery error reported by a transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Failure that will not go away on retry (e.g., 5xx SMTP codes).
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// Failure that may succeed on a later attempt (e.g., 4xx SMTP codes).
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    /// Internal problem unrelated to the remote server.
    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Permanent errors that a retry will not fix.
#[derive(Debug, Clone, Error)]
pub enum PermanentError {
    /// Receiver address could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The server rejected the message or the recipient.
    #[error("Rejected by server: {0}")]
    Rejected(String),
}

/// Temporary errors, typically network trouble or 4xx replies.
#[derive(Debug, Clone, Error)]
pub enum TemporaryError {
    /// Failed to establish a connection to the relay.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection or command timed out.
    #[error("Connection timed out: {0}")]
    Timeout(String),

    /// TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshakeFailed(String),

    /// Server returned a temporary failure code.
    #[error("Temporary SMTP error: {0}")]
    SmtpTemporary(String),
}

/// System-level errors that indicate internal problems.
#[derive(Debug, Clone, Error)]
pub enum SystemError {
    /// The outgoing message could not be assembled.
    #[error("Message build error: {0}")]
    MessageBuild(String),

    /// Invalid transport configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransportError {
    /// Returns `true` if this error is temporary and a retry may succeed.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns `true` if this error is permanent.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Returns `true` if the relay itself could not be reached, meaning every
    /// remaining receiver would fail the same way.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Temporary(
                TemporaryError::ConnectionFailed(_)
                    | TemporaryError::Timeout(_)
                    | TemporaryError::TlsHandshakeFailed(_)
            )
        )
    }
}

impl From<lettre::transport::smtp::Error> for TransportError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        let message = e.to_string();

        if e.is_permanent() {
            PermanentError::Rejected(message).into()
        } else if e.is_transient() {
            TemporaryError::SmtpTemporary(message).into()
        } else if e.is_timeout() {
            TemporaryError::Timeout(message).into()
        } else if e.is_tls() {
            TemporaryError::TlsHandshakeFailed(message).into()
        } else if e.is_client() {
            SystemError::Internal(message).into()
        } else {
            TemporaryError::ConnectionFailed(message).into()
        }
    }
}

impl From<lettre::address::AddressError> for TransportError {
    fn from(e: lettre::address::AddressError) -> Self {
        PermanentError::InvalidAddress(e.to_string()).into()
    }
}

impl From<lettre::error::Error> for TransportError {
    fn from(e: lettre::error::Error) -> Self {
        SystemError::MessageBuild(e.to_string()).into()
    }
}
