//! Application State
//!
//! The `AppState` struct is the state container handed to every transport
//! handler: the signal store, the subscription engine, the connection
//! registry, and the command processor.
//!
//! # Thread Safety
//!
//! All state is designed to be shared across handler tasks:
//! - `Arc<SignalStore>` with its internal read-write lock
//! - `Arc<SubscriptionEngine>` with its internal mutex
//! - `Arc<ChannelRegistry>` guarding the outbound sender map
//!
//! # Notification Delivery
//!
//! The registry doubles as the subscription pump's `NotificationSink`:
//! recovering a connection id from a subscription id ends in a lookup
//! here, and a connection that has since closed simply drops the message.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::protocol::CommandProcessor;
use crate::signals::SignalStore;
use crate::subscription::{NotificationSink, SubscriptionEngine};

/// Outbound message queue of one connection
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Live connections and their outbound senders
pub struct ChannelRegistry {
    next_conn_id: AtomicU32,
    senders: Mutex<HashMap<u32, OutboundSender>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            // Connection ids start at 1 so a packed subscription id can
            // never collapse to the bare local component.
            next_conn_id: AtomicU32::new(1),
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new connection, assigning its id
    pub fn register(&self, sender: OutboundSender) -> u32 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.senders.lock().unwrap().insert(conn_id, sender);
        conn_id
    }

    /// Remove a closed connection
    pub fn unregister(&self, conn_id: u32) {
        self.senders.lock().unwrap().remove(&conn_id);
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }
}

impl NotificationSink for ChannelRegistry {
    fn send(&self, conn_id: u32, message: String) {
        let senders = self.senders.lock().unwrap();
        match senders.get(&conn_id) {
            Some(sender) => {
                if sender.send(message).is_err() {
                    tracing::debug!(
                        "[Server] outbound queue of connection {} is gone",
                        conn_id
                    );
                }
            }
            None => {
                tracing::debug!(
                    "[Server] dropping notification for closed connection {}",
                    conn_id
                );
            }
        }
    }
}

/// Shared state for all transport handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SignalStore>,
    pub engine: Arc<SubscriptionEngine>,
    pub registry: Arc<ChannelRegistry>,
    pub processor: Arc<CommandProcessor>,
}
