//! Signal Tree and Store
//!
//! This module contains the path-addressable signal store at the heart of
//! the server:
//!
//! - `path` - The `VssPath` value type: dotted-path parsing and wildcards
//! - `datatype` - Signal datatypes and set-time value coercion
//! - `tree` - The in-memory node tree loaded from a VSS JSON document
//! - `store` - The lock-guarded store exposing get/set/metadata operations

pub mod datatype;
pub mod path;
pub mod store;
pub mod tree;

pub use datatype::DataType;
pub use path::VssPath;
pub use store::{SignalStore, SignalUpdate};
pub use tree::SignalTree;
