//! Server Error Types
//!
//! This module defines the error type used throughout the signal server.
//! Every failure that can surface from a dispatched command is represented
//! as a variant here; the command processor is the single place where these
//! are converted into JSON error envelopes.
//!
//! # Error Categories
//!
//! - Path errors: `InvalidPath`, `PathNotFound`, `AmbiguousPath`
//! - Value errors: `TypeMismatch`, `OutOfBounds`
//! - Access errors: `NoPermission`, `InvalidToken`
//! - Infrastructure errors: `UpstreamUnavailable`, `SpecLoad`, `Schema`, `Generic`

use thiserror::Error;

/// All error kinds that a dispatched command can produce
///
/// Each variant carries a human-readable message that ends up in the
/// `error.message` field of the wire envelope. The numeric code and reason
/// string are derived in the `conversion` module.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServerError {
    /// Path is malformed or names a node that does not exist
    #[error("Invalid path: {message}")]
    InvalidPath {
        /// Human-readable error message
        message: String,
    },

    /// Path resolution yielded zero leaves
    #[error("I can not find {path} in my db")]
    PathNotFound {
        /// The path as the client sent it
        path: String,
    },

    /// Path resolved to more than one leaf where exactly one is required
    #[error("{message}")]
    AmbiguousPath {
        /// Human-readable error message
        message: String,
    },

    /// Value cannot be represented in the signal's datatype
    #[error("{message}")]
    TypeMismatch {
        /// Human-readable error message
        message: String,
    },

    /// Value is the right shape but outside the datatype's range
    #[error("{message}")]
    OutOfBounds {
        /// Human-readable error message
        message: String,
    },

    /// Channel lacks the required read or write permission
    #[error("{message}")]
    NoPermission {
        /// Human-readable error message
        message: String,
    },

    /// Token failed signature, expiry, or claim verification
    #[error("{message}")]
    InvalidToken {
        /// Human-readable error message
        message: String,
    },

    /// Permission-manager daemon could not be reached
    #[error("{message}")]
    UpstreamUnavailable {
        /// Human-readable error message
        message: String,
    },

    /// Request failed per-action validation
    #[error("Schema error: {message}")]
    Schema {
        /// Human-readable error message
        message: String,
    },

    /// VSS spec document could not be loaded
    #[error("Failed to load VSS spec: {message}")]
    SpecLoad {
        /// Human-readable error message
        message: String,
    },

    /// Any other failure
    #[error("{message}")]
    Generic {
        /// Human-readable error message
        message: String,
    },
}

impl ServerError {
    /// Create an invalid-path error
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    /// Create a path-not-found error for the given client path
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create an ambiguous-path error
    pub fn ambiguous_path(message: impl Into<String>) -> Self {
        Self::AmbiguousPath {
            message: message.into(),
        }
    }

    /// Create a type-mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    /// Create an out-of-bounds error
    pub fn out_of_bounds(message: impl Into<String>) -> Self {
        Self::OutOfBounds {
            message: message.into(),
        }
    }

    /// Create a no-permission error
    pub fn no_permission(message: impl Into<String>) -> Self {
        Self::NoPermission {
            message: message.into(),
        }
    }

    /// Create an invalid-token error
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Create an upstream-unavailable error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Create a schema-validation error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a spec-load error
    pub fn spec_load(message: impl Into<String>) -> Self {
        Self::SpecLoad {
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        Self::generic(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_not_found_message() {
        let err = ServerError::path_not_found("Vehicle.No.Such");
        assert_eq!(err.to_string(), "I can not find Vehicle.No.Such in my db");
    }

    #[test]
    fn test_schema_error_prefixes_message() {
        let err = ServerError::schema("missing field `path`");
        assert_eq!(err.to_string(), "Schema error: missing field `path`");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ServerError = json_err.into();
        assert!(matches!(err, ServerError::Generic { .. }));
    }
}
