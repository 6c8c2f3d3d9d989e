//! Error Types for the Signal Server
//!
//! This module defines the error kinds that can occur while processing
//! client commands, together with their mapping onto the wire protocol's
//! numeric error codes.
//!
//! # Structure
//!
//! - `types` - The `ServerError` enum covering every failure kind
//! - `conversion` - Mapping from error kinds to `(number, reason)` pairs

pub mod conversion;
pub mod types;

pub use types::ServerError;
