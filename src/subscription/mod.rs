//! Subscription Engine
//!
//! Subscriptions map signal identity (the uuid from the spec document) to
//! the connections that want change notifications. A successful `set`
//! publishes one queue item per subscription; a dedicated background pump
//! drains the queue and hands finished notification messages to the
//! transport.
//!
//! # Modules
//!
//! - `id` - Packing of connection id + local id into the wire subscription id
//! - `engine` - The index and bounded update queue
//! - `pump` - The background worker and the `NotificationSink` seam

pub mod engine;
pub mod id;
pub mod pump;

pub use engine::SubscriptionEngine;
pub use id::{SubscriptionId, CLIENT_MASK};
pub use pump::{NotificationSink, SubscriptionPump};
