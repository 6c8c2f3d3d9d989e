//! Error Conversion
//!
//! This module maps each `ServerError` kind onto the wire protocol's numeric
//! error code and fixed reason string. The command processor uses this
//! mapping when shaping error envelopes; nothing else in the crate needs to
//! know about wire codes.
//!
//! # Code Map
//!
//! | number | reason | kinds |
//! |---|---|---|
//! | 400 | Bad Request | `AmbiguousPath`, `TypeMismatch`, `Schema` |
//! | 400 | Value passed is out of bounds | `OutOfBounds` |
//! | 400 | Unknown error | `Generic`, `SpecLoad` |
//! | 401 | Invalid Token | `InvalidToken` |
//! | 403 | Forbidden | `NoPermission` |
//! | 404 | Path not found | `InvalidPath`, `PathNotFound` |
//! | 501 | No token received from permission management daemon | `UpstreamUnavailable` |

use crate::error::types::ServerError;

impl ServerError {
    /// Numeric error code for the wire envelope
    pub fn wire_number(&self) -> u16 {
        match self {
            Self::InvalidPath { .. } | Self::PathNotFound { .. } => 404,
            Self::AmbiguousPath { .. }
            | Self::TypeMismatch { .. }
            | Self::OutOfBounds { .. }
            | Self::Schema { .. }
            | Self::SpecLoad { .. }
            | Self::Generic { .. } => 400,
            Self::NoPermission { .. } => 403,
            Self::InvalidToken { .. } => 401,
            Self::UpstreamUnavailable { .. } => 501,
        }
    }

    /// Fixed reason string for the wire envelope
    pub fn wire_reason(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } | Self::PathNotFound { .. } => "Path not found",
            Self::AmbiguousPath { .. } | Self::TypeMismatch { .. } | Self::Schema { .. } => {
                "Bad Request"
            }
            Self::OutOfBounds { .. } => "Value passed is out of bounds",
            Self::NoPermission { .. } => "Forbidden",
            Self::InvalidToken { .. } => "Invalid Token",
            Self::UpstreamUnavailable { .. } => {
                "No token received from permission management daemon"
            }
            Self::SpecLoad { .. } | Self::Generic { .. } => "Unknown error",
        }
    }
}
