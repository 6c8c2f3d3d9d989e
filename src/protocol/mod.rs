//! Command Protocol
//!
//! The JSON request/response dialect spoken over the message channel.
//! Requests carry an `action` and a `requestId`; responses echo both and
//! add a Unix-seconds timestamp. Failures become an `error` object with a
//! stable numeric code.
//!
//! # Modules
//!
//! - `requests` - Per-action typed request bodies and validation
//! - `processor` - Dispatch and the single error-mapping boundary
//! - `responses` - Success and error envelope construction

pub mod processor;
pub mod requests;
pub mod responses;

pub use processor::CommandProcessor;
