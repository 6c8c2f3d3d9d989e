//! Subscription Index and Update Queue
//!
//! The engine owns two pieces of state behind one mutex: the index mapping
//! each signal uuid to its subscriptions, and the bounded FIFO of pending
//! notifications. The mutex is held only long enough to touch the maps;
//! in particular `publish` never calls into the transport.
//!
//! The queue is bounded at `QUEUE_CAPACITY`. On overflow the oldest pending
//! item for the same signal gives way first (so a bursty signal cannot
//! evict quieter ones), falling back to the oldest item overall.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rand::Rng;
use serde_json::Value;
use tokio::sync::Notify;

use crate::subscription::id::{SubscriptionId, CLIENT_MASK};

/// Maximum number of queued, undelivered notifications
pub const QUEUE_CAPACITY: usize = 10_000;

/// One pending notification
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub sub_id: u64,
    pub signal_uuid: String,
    pub value: Value,
    pub timestamp: i64,
}

#[derive(Default)]
struct EngineState {
    /// signal uuid -> (packed sub id -> connection id)
    index: HashMap<String, HashMap<u64, u32>>,
    queue: VecDeque<QueuedNotification>,
}

/// Shared subscription state
pub struct SubscriptionEngine {
    state: Mutex<EngineState>,
    notify: Notify,
    running: AtomicBool,
}

impl Default for SubscriptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            notify: Notify::new(),
            running: AtomicBool::new(true),
        }
    }

    /// Register a subscription for `conn_id` on a signal
    ///
    /// Returns the packed wire id. The random local component is re-drawn
    /// on the rare collision with an existing id.
    pub fn subscribe(&self, signal_uuid: &str, conn_id: u32) -> u64 {
        let mut state = self.state.lock().unwrap();
        let packed = loop {
            let local_id = rand::thread_rng().gen_range(0..(CLIENT_MASK - 1) as u32);
            let candidate = SubscriptionId { conn_id, local_id }.packed();
            let taken = state
                .index
                .values()
                .any(|subs| subs.contains_key(&candidate));
            if !taken {
                break candidate;
            }
        };
        state
            .index
            .entry(signal_uuid.to_string())
            .or_default()
            .insert(packed, conn_id);
        tracing::debug!(
            "[Subscription] connection {} subscribed to {} as {}",
            conn_id,
            signal_uuid,
            packed
        );
        packed
    }

    /// Remove one subscription; absence is not an error
    pub fn unsubscribe(&self, sub_id: u64) {
        let mut state = self.state.lock().unwrap();
        for subs in state.index.values_mut() {
            subs.remove(&sub_id);
        }
    }

    /// Remove every subscription owned by a connection
    ///
    /// Called by the transport when the connection closes.
    pub fn unsubscribe_all(&self, conn_id: u32) {
        let mut state = self.state.lock().unwrap();
        for subs in state.index.values_mut() {
            subs.retain(|_, owner| *owner != conn_id);
        }
        tracing::debug!("[Subscription] cleared subscriptions of connection {}", conn_id);
    }

    /// Queue one notification per subscription on a signal
    pub fn publish(&self, signal_uuid: &str, value: &Value, timestamp: i64) {
        let mut state = self.state.lock().unwrap();
        let sub_ids: Vec<u64> = match state.index.get(signal_uuid) {
            Some(subs) => subs.keys().copied().collect(),
            None => return,
        };
        for sub_id in sub_ids {
            if state.queue.len() >= QUEUE_CAPACITY {
                evict_one(&mut state.queue, signal_uuid);
            }
            state.queue.push_back(QueuedNotification {
                sub_id,
                signal_uuid: signal_uuid.to_string(),
                value: value.clone(),
                timestamp,
            });
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Pop the next deliverable notification
    ///
    /// Items whose subscription has been removed since enqueue are dropped
    /// here, so a disconnecting client never receives stragglers.
    pub(crate) fn pop(&self) -> Option<QueuedNotification> {
        let mut state = self.state.lock().unwrap();
        while let Some(item) = state.queue.pop_front() {
            let live = state
                .index
                .get(&item.signal_uuid)
                .map_or(false, |subs| subs.contains_key(&item.sub_id));
            if live {
                return Some(item);
            }
        }
        None
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Wake the pump
    pub(crate) fn wake(&self) {
        self.notify.notify_one();
    }

    /// Wait for the next wake-up
    pub(crate) async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Number of live subscriptions owned by a connection
    pub fn subscription_count(&self, conn_id: u32) -> usize {
        let state = self.state.lock().unwrap();
        state
            .index
            .values()
            .map(|subs| subs.values().filter(|owner| **owner == conn_id).count())
            .sum()
    }

    /// Number of queued, undelivered notifications
    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }
}

fn evict_one(queue: &mut VecDeque<QueuedNotification>, signal_uuid: &str) {
    let position = queue
        .iter()
        .position(|item| item.signal_uuid == signal_uuid)
        .unwrap_or(0);
    if let Some(dropped) = queue.remove(position) {
        tracing::warn!(
            "[Subscription] queue full, dropped update for {}",
            dropped.signal_uuid
        );
    }
}
