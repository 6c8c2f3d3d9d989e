//! Per-Connection Channel Record
//!
//! The transport creates one `Channel` when it accepts a connection and
//! drops it on disconnect. Everything the command processor needs to know
//! about a client lives here: whether a token has been installed, the
//! projected permissions, and when they expire. Expiry is re-checked at the
//! start of every guarded operation, never mid-operation.

use crate::auth::permissions::PermissionSet;

/// Server-side record for one client connection
#[derive(Debug, Clone)]
pub struct Channel {
    /// Connection id assigned by the transport
    pub conn_id: u32,
    /// Whether a token has been successfully installed
    pub authorized: bool,
    /// Whether the token allows metadata patching
    pub modify_tree: bool,
    /// Permissions projected from the token's claims
    pub permissions: PermissionSet,
    /// Unix second at which the installed token expires
    pub token_expiry: i64,
}

impl Channel {
    /// A fresh, unauthorized channel
    pub fn new(conn_id: u32) -> Self {
        Self {
            conn_id,
            authorized: false,
            modify_tree: false,
            permissions: PermissionSet::empty(),
            token_expiry: 0,
        }
    }

    /// Whether an installed token is still valid at `now`
    pub fn token_valid(&self, now: i64) -> bool {
        self.authorized && now < self.token_expiry
    }

    /// Read check for a dotted path; expired tokens yield false
    pub fn can_read(&self, path: &str, now: i64) -> bool {
        self.token_valid(now) && self.permissions.can_read(path)
    }

    /// Write check for a dotted path; expired tokens yield false
    pub fn can_write(&self, path: &str, now: i64) -> bool {
        self.token_valid(now) && self.permissions.can_write(path)
    }

    /// Drop any installed authorization
    pub fn deauthorize(&mut self) {
        self.authorized = false;
        self.modify_tree = false;
        self.permissions = PermissionSet::empty();
        self.token_expiry = 0;
    }
}
