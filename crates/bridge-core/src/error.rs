//! Error types for the SPDK bridge.
//!
//! Every failure surfaced by the bridge carries a machine-checkable [`Code`]
//! and a human-readable message. Callers branch on the code; existing tooling
//! matches on the message text, so the `Display` output of each variant is
//! part of the public contract.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Status class of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    FailedPrecondition,
    Unimplemented,
    Internal,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Backend call failures, always tagged with the backend method name
    #[error("{method}: {message}")]
    Encode {
        method: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{method}: {message}")]
    Transport {
        method: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{method}: {message}")]
    Protocol { method: String, message: String },

    #[error("{method}: json response error: {message}")]
    Backend {
        method: String,
        code: i64,
        message: String,
    },

    #[error("{method}: call timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("{method}: call cancelled")]
    Cancelled { method: String },

    // Caller-facing failures
    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("unable to find key {key}")]
    NotFound { key: String },

    #[error("unable to find pagination token {token}")]
    PageTokenNotFound { token: String },

    #[error("{message}")]
    FailedPrecondition { message: String },

    #[error("{0}")]
    Unimplemented(String),

    // Local environment
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl BridgeError {
    /// Shorthand for an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BridgeError::InvalidArgument {
            message: message.into(),
        }
    }

    /// A required request field was absent or empty.
    pub fn missing_field(field: &str) -> Self {
        Self::invalid_argument(format!("missing required field: {}", field))
    }

    /// Shorthand for a lookup miss on `key`.
    pub fn not_found(key: impl Into<String>) -> Self {
        BridgeError::NotFound { key: key.into() }
    }

    /// Transport failure while talking to the backend.
    pub fn transport(method: &str, err: std::io::Error) -> Self {
        BridgeError::Transport {
            method: method.to_string(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Malformed or unexpected reply from the backend.
    pub fn protocol(method: &str, message: impl Into<String>) -> Self {
        BridgeError::Protocol {
            method: method.to_string(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Status class of this error.
    pub fn code(&self) -> Code {
        match self {
            BridgeError::Encode { .. } => Code::Internal,
            BridgeError::Transport { .. }
            | BridgeError::Protocol { .. }
            | BridgeError::Backend { .. } => Code::Unknown,
            BridgeError::Timeout { .. } => Code::DeadlineExceeded,
            BridgeError::Cancelled { .. } => Code::Cancelled,
            BridgeError::InvalidArgument { .. } => Code::InvalidArgument,
            BridgeError::NotFound { .. } | BridgeError::PageTokenNotFound { .. } => Code::NotFound,
            BridgeError::FailedPrecondition { .. } => Code::FailedPrecondition,
            BridgeError::Unimplemented(_) => Code::Unimplemented,
            BridgeError::Io { .. } | BridgeError::Config { .. } | BridgeError::Other(_) => {
                Code::Internal
            }
        }
    }

    /// Convert to a JSON-RPC error code for the outer API server.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Application-defined codes (-32000 to -32099):
    /// - -32000: Backend unreachable or misbehaving
    /// - -32001: Resource or page token not found
    /// - -32002: Precondition failed
    /// - -32003: Deadline exceeded
    /// - -32004: Cancelled by caller
    pub fn to_rpc_error_code(&self) -> i32 {
        match self.code() {
            Code::Unknown => -32000,
            Code::NotFound => -32001,
            Code::FailedPrecondition => -32002,
            Code::DeadlineExceeded => -32003,
            Code::Cancelled => -32004,
            Code::InvalidArgument => -32602,
            Code::Unimplemented => -32601,
            Code::Internal => -32603,
        }
    }
}
