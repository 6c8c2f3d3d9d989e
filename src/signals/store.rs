//! Signal Store
//!
//! The store owns the signal tree behind a read-write lock and exposes the
//! operations the command processor calls: get, set, metadata projection,
//! and metadata patching. Every operation takes the channel of the
//! requesting client and enforces its permissions per leaf.
//!
//! # Locking
//!
//! `set_signal`, `update_metadata`, and `load` take the write lock; all
//! other operations take the read lock. The lock is never held across a
//! call into the subscription engine: `set_signal` returns the list of
//! committed updates and the caller publishes them after the guard drops.
//!
//! # Set Semantics
//!
//! A set request is expanded into concrete (leaf, value) targets first
//! (resolving the wildcard list form), then validated as a whole: write
//! access and datatype coercion for every target. Only when all targets
//! pass are the values committed, so subscribers never observe a half
//! applied multi-leaf set.

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::auth::Channel;
use crate::error::ServerError;
use crate::signals::path::VssPath;
use crate::signals::tree::{Node, SignalTree};

/// One committed value change, ready for publication
#[derive(Debug, Clone)]
pub struct SignalUpdate {
    pub uuid: String,
    pub value: Value,
    pub timestamp: i64,
}

/// Lock-guarded owner of the signal tree
pub struct SignalStore {
    tree: RwLock<SignalTree>,
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalStore {
    /// A store with an empty tree; `load` installs the real one
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(SignalTree::empty()),
        }
    }

    /// Parse a VSS JSON document and replace the tree atomically
    pub async fn load(&self, spec_bytes: &[u8]) -> Result<(), ServerError> {
        let tree = SignalTree::from_slice(spec_bytes)?;
        *self.tree.write().await = tree;
        tracing::info!("[Store] VSS tree loaded");
        Ok(())
    }

    /// Metadata projection for a wildcard-free path
    ///
    /// Returns the chain from root to the node, or JSON `null` when the
    /// path does not resolve.
    pub async fn get_metadata(&self, path: &VssPath) -> Result<Value, ServerError> {
        if path.is_wildcard() {
            return Err(ServerError::invalid_path(
                "wildcards are not permitted in metadata requests",
            ));
        }
        let tree = self.tree.read().await;
        Ok(tree.metadata_chain(path))
    }

    /// Merge a metadata patch into a signal leaf
    ///
    /// Requires the channel's token to carry the modify-tree claim. The
    /// identity fields of a leaf (type, datatype, uuid, value, timestamp)
    /// cannot be patched.
    pub async fn update_metadata(
        &self,
        channel: &Channel,
        path: &VssPath,
        patch: &Map<String, Value>,
    ) -> Result<(), ServerError> {
        let now = Utc::now().timestamp();
        if !channel.token_valid(now) || !channel.modify_tree {
            return Err(ServerError::no_permission(
                "no permission to modify the tree",
            ));
        }
        if path.is_wildcard() {
            return Err(ServerError::invalid_path(
                "wildcards are not permitted in metadata requests",
            ));
        }

        let mut tree = self.tree.write().await;
        let node = tree
            .node_mut(path.segments())
            .ok_or_else(|| ServerError::invalid_path(format!("{} does not exist", path)))?;
        let signal = match node {
            Node::Signal(signal) => signal,
            Node::Branch(_) => {
                return Err(ServerError::invalid_path(format!(
                    "{} is a branch; metadata patches apply to signals",
                    path
                )));
            }
        };

        for (key, value) in patch {
            match key.as_str() {
                "description" => {
                    signal.description = value.as_str().map(str::to_string);
                }
                "unit" => {
                    signal.unit = value.as_str().map(str::to_string);
                }
                "type" | "datatype" | "uuid" | "value" | "timestamp" => {
                    return Err(ServerError::schema(format!(
                        "field `{}` cannot be patched",
                        key
                    )));
                }
                _ => {
                    signal.extra.insert(key.clone(), value.clone());
                }
            }
        }
        tracing::debug!("[Store] metadata patched at {}", path);
        Ok(())
    }

    /// Read one or more signals
    ///
    /// Wildcards and branch paths enumerate leaves; leaves the channel may
    /// not read are omitted and reported in a `warning` field. Fails with
    /// `PathNotFound` when nothing resolves and `NoPermission` when every
    /// resolved leaf is denied.
    pub async fn get_signal(
        &self,
        channel: &Channel,
        path: &VssPath,
    ) -> Result<Value, ServerError> {
        let now = Utc::now().timestamp();
        let tree = self.tree.read().await;
        let leaves = tree.leaves(path)?;
        if leaves.is_empty() {
            return Err(ServerError::path_not_found(path.to_string()));
        }

        let mut readable = Vec::new();
        let mut denied = Vec::new();
        for (dotted, signal) in &leaves {
            if channel.can_read(&dotted.to_string(), now) {
                readable.push((dotted, *signal));
            } else {
                denied.push(dotted.to_string());
            }
        }
        if readable.is_empty() {
            return Err(ServerError::no_permission(format!(
                "No read access to {}",
                path
            )));
        }

        let mut answer = Map::new();
        if leaves.len() == 1 {
            let (dotted, signal) = &readable[0];
            answer.insert("path".into(), Value::from(dotted.to_string()));
            match &signal.value {
                Some(value) => {
                    answer.insert("value".into(), value.clone());
                    answer.insert("timestamp".into(), Value::from(signal.timestamp));
                }
                None => {
                    answer.insert("value".into(), Value::from("---"));
                }
            }
        } else {
            let mut entries = Vec::with_capacity(readable.len());
            for (dotted, signal) in &readable {
                let mut entry = Map::new();
                let value = signal.value.clone().unwrap_or_else(|| Value::from("---"));
                entry.insert(dotted.to_string(), value);
                entries.push(Value::Object(entry));
            }
            answer.insert("value".into(), Value::Array(entries));
        }
        if !denied.is_empty() {
            answer.insert(
                "warning".into(),
                Value::from(format!("No read access to [ {} ]", denied.join(","))),
            );
        }
        Ok(Value::Object(answer))
    }

    /// Write one or more signals
    ///
    /// Returns the committed updates for publication. See the module notes
    /// for the all-or-nothing validation order.
    pub async fn set_signal(
        &self,
        channel: &Channel,
        path: &VssPath,
        value: Value,
    ) -> Result<Vec<SignalUpdate>, ServerError> {
        let targets = expand_set_targets(path, value)?;
        let now = Utc::now().timestamp();
        let mut tree = self.tree.write().await;

        // Validation pass: resolve, access-check, and coerce every target
        // before touching any value.
        let mut staged = Vec::with_capacity(targets.len());
        for (target, raw) in &targets {
            let node = tree.node(target.segments());
            let signal = match node {
                Some(Node::Signal(signal)) => signal,
                Some(Node::Branch(_)) => {
                    return Err(ServerError::ambiguous_path(format!(
                        "Path {} points to a branch. Needs to point to a signal",
                        target
                    )));
                }
                None => {
                    return Err(ServerError::path_not_found(target.to_string()));
                }
            };
            if !channel.can_write(&target.to_string(), now) {
                return Err(ServerError::no_permission(format!(
                    "no write access to {}",
                    target
                )));
            }
            let coerced = signal.datatype.coerce(raw)?;
            staged.push((target.clone(), coerced));
        }

        let mut updates = Vec::with_capacity(staged.len());
        for (target, coerced) in staged {
            if let Some(signal) = tree.signal_mut(target.segments()) {
                signal.value = Some(coerced.clone());
                signal.timestamp = now;
                updates.push(SignalUpdate {
                    uuid: signal.uuid.clone(),
                    value: coerced,
                    timestamp: now,
                });
                tracing::debug!("[Store] value set at {}", target);
            }
        }
        Ok(updates)
    }

    /// Resolve a subscribe request to its single target leaf
    ///
    /// Returns the leaf's uuid and dotted path. Fails with `PathNotFound`
    /// for zero leaves, `AmbiguousPath` for more than one, and
    /// `NoPermission` when the channel may not read the leaf.
    pub async fn resolve_subscription(
        &self,
        channel: &Channel,
        path: &VssPath,
    ) -> Result<(String, String), ServerError> {
        let now = Utc::now().timestamp();
        let tree = self.tree.read().await;
        let leaves = tree.leaves(path)?;
        match leaves.len() {
            0 => Err(ServerError::path_not_found(path.to_string())),
            1 => {
                let (dotted, signal) = &leaves[0];
                if !channel.can_read(&dotted.to_string(), now) {
                    return Err(ServerError::no_permission(
                        "no permission to subscribe to path",
                    ));
                }
                let query = tree.normalize(dotted)?;
                tracing::debug!("[Store] subscription resolved to {}", query);
                Ok((signal.uuid.clone(), dotted.to_string()))
            }
            n => Err(ServerError::ambiguous_path(format!(
                "{} signals found in path {}. Subscribe works for 1 signal at a time",
                n, path
            ))),
        }
    }
}

/// Expand a set request into concrete (leaf path, raw value) targets
///
/// The array form carries one single-key object per leaf, the key
/// completing the wildcard. Elements with more or fewer keys are rejected.
fn expand_set_targets(
    path: &VssPath,
    value: Value,
) -> Result<Vec<(VssPath, Value)>, ServerError> {
    match value {
        Value::Array(items) => {
            let mut targets = Vec::with_capacity(items.len());
            for item in items {
                let obj = item.as_object().ok_or_else(|| {
                    ServerError::schema("wildcard set elements must be JSON objects")
                })?;
                if obj.len() != 1 {
                    return Err(ServerError::schema(format!(
                        "wildcard set element must have exactly one key, found {}",
                        obj.len()
                    )));
                }
                for (leaf_name, leaf_value) in obj {
                    targets.push((path.complete_wildcard(leaf_name), leaf_value.clone()));
                }
            }
            Ok(targets)
        }
        single => {
            if path.is_wildcard() {
                return Err(ServerError::schema(
                    "wildcard set requires an array of single-key objects",
                ));
            }
            Ok(vec![(path.clone(), single)])
        }
    }
}
