//! Authorization
//!
//! Clients authorize a connection by presenting a signed JWT whose claims
//! map path globs to read/write rights. This module verifies tokens,
//! projects claims onto the per-connection channel record, and answers the
//! read/write checks every store operation is gated on.
//!
//! # Modules
//!
//! - `channel` - Per-connection record carrying the installed permissions
//! - `permissions` - Path-glob permission set and matching rules
//! - `token` - JWT verification with a runtime-replaceable public key
//! - `perm_client` - Client for the external permission-manager daemon

pub mod channel;
pub mod perm_client;
pub mod permissions;
pub mod token;

pub use channel::Channel;
pub use permissions::{Access, PermissionSet};
pub use token::{Authenticator, Claims};
