//! Vehicle Signal Server
//!
//! An in-process broker exposing a hierarchical vehicle signal tree (VSS)
//! to concurrent clients over a WebSocket JSON dialect. Clients get and set
//! typed signal values, subscribe to changes, retrieve metadata, and
//! authorize themselves with signed tokens carrying per-path read/write
//! claims.
//!
//! # Module Structure
//!
//! - **`signals`** - The path-addressable signal store behind a read-write lock
//! - **`auth`** - Token verification and per-channel permission projection
//! - **`subscription`** - Change fan-out through a bounded queue and pump task
//! - **`protocol`** - The JSON request/response dialect and dispatch
//! - **`server`** / **`routes`** - Configuration, state, and transport glue
//! - **`error`** - The error kinds and their wire code mapping

pub mod auth;
pub mod error;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod signals;
pub mod subscription;
