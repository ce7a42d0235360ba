//! Unified application error types for SafeMate.
//!
//! Every failure is classified into an [`ErrorKind`] before it leaves the
//! repository layer, so handlers never see an opaque "unknown error".

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested folder or collection was not found (or is not yet visible).
    NotFound,
    /// No account identity was supplied, or the signer does not match the account.
    Unauthorized,
    /// The account may read the resource but not mutate it.
    Forbidden,
    /// Generic input validation failed.
    Validation,
    /// The folder name is empty, too long, or contains forbidden characters.
    InvalidName,
    /// Creating the folder would exceed the configured maximum depth.
    DepthExceeded,
    /// The ledger could not be reached after retries; distinct from "zero folders".
    DiscoveryUnavailable,
    /// The signing key for the account could not be obtained.
    KeyUnavailable,
    /// An NFT metadata payload could not be decoded.
    CorruptMetadata,
    /// The operation conflicts with current ledger state.
    Conflict,
    /// A ledger write timed out or the ledger was unreachable; outcome unknown.
    LedgerUnavailable,
    /// The ledger rejected a transaction.
    LedgerRejected,
    /// The caller cancelled the operation.
    Cancelled,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl ErrorKind {
    /// Machine-readable error code surfaced through the API.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::Validation => "ValidationError",
            Self::InvalidName => "InvalidName",
            Self::DepthExceeded => "DepthExceeded",
            Self::DiscoveryUnavailable => "DiscoveryUnavailable",
            Self::KeyUnavailable => "KeyUnavailable",
            Self::CorruptMetadata => "CorruptMetadata",
            Self::Conflict => "Conflict",
            Self::LedgerUnavailable => "LedgerUnavailable",
            Self::LedgerRejected => "LedgerRejected",
            Self::Cancelled => "Cancelled",
            Self::Configuration => "ConfigurationError",
            Self::Serialization => "SerializationError",
            Self::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The unified application error used throughout SafeMate.
///
/// Crate-specific errors (ledger, codec, config) are mapped into `AppError`
/// using `From` impls or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an invalid-name error.
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidName, message)
    }

    /// Create a depth-exceeded error.
    pub fn depth_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DepthExceeded, message)
    }

    /// Create a discovery-unavailable error.
    pub fn discovery_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DiscoveryUnavailable, message)
    }

    /// Create a key-unavailable error.
    pub fn key_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyUnavailable, message)
    }

    /// Create a corrupt-metadata error.
    pub fn corrupt_metadata(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptMetadata, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a ledger-unavailable error.
    pub fn ledger_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LedgerUnavailable, message)
    }

    /// Create a ledger-rejected error.
    pub fn ledger_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LedgerRejected, message)
    }

    /// Create a cancelled error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
