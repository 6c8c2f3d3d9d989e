//! Subscription Pump
//!
//! One background task drains the engine's queue and delivers finished
//! notification messages through a `NotificationSink`. The sink is the
//! seam between the engine and the transport: the production implementation
//! looks up the connection's outbound channel, tests substitute a recorder.
//!
//! The pump wakes on every publish; the 10 ms fallback sleep only bounds
//! how long a missed wake-up or a stop request can linger.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::subscription::engine::{QueuedNotification, SubscriptionEngine};
use crate::subscription::id::SubscriptionId;

/// Destination for finished notification messages
///
/// `send` must not block; implementations hand the message to the
/// connection's outbound queue and log delivery failures.
pub trait NotificationSink: Send + Sync {
    fn send(&self, conn_id: u32, message: String);
}

/// Owner of the background delivery task
pub struct SubscriptionPump {
    engine: Arc<SubscriptionEngine>,
    handle: JoinHandle<()>,
}

impl SubscriptionPump {
    /// Spawn the delivery task
    pub fn start(engine: Arc<SubscriptionEngine>, sink: Arc<dyn NotificationSink>) -> Self {
        engine.set_running(true);
        let worker = engine.clone();
        let handle = tokio::spawn(async move {
            tracing::debug!("[Subscription] pump started");
            while worker.is_running() {
                match worker.pop() {
                    Some(item) => deliver(&*sink, item),
                    None => {
                        tokio::select! {
                            _ = worker.notified() => {}
                            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
                        }
                    }
                }
            }
            tracing::info!("[Subscription] pump stopped");
        });
        Self { engine, handle }
    }

    /// Stop the pump and wait for the task to finish
    ///
    /// Pending queue items are dropped, not drained.
    pub async fn stop(self) {
        self.engine.set_running(false);
        self.engine.wake();
        if let Err(e) = self.handle.await {
            tracing::error!("[Subscription] pump task panicked: {}", e);
        }
    }
}

fn deliver(sink: &dyn NotificationSink, item: QueuedNotification) {
    let conn_id = SubscriptionId::from_packed(item.sub_id).conn_id;
    let message = serde_json::json!({
        "action": "subscribe",
        "subscriptionId": item.sub_id,
        "value": item.value,
        "timestamp": item.timestamp,
    })
    .to_string();
    sink.send(conn_id, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(u32, String)>>,
    }

    impl NotificationSink for RecordingSink {
        fn send(&self, conn_id: u32, message: String) {
            self.sent.lock().unwrap().push((conn_id, message));
        }
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<(u32, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_pump_delivers_to_owning_connection() {
        let engine = Arc::new(SubscriptionEngine::new());
        let sink = Arc::new(RecordingSink::default());
        let pump = SubscriptionPump::start(engine.clone(), sink.clone());

        let sub_id = engine.subscribe("uuid-1", 9);
        engine.publish("uuid-1", &json!(7), 1234);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, 9);

        let body: serde_json::Value = serde_json::from_str(&messages[0].1).unwrap();
        assert_eq!(body["action"], "subscribe");
        assert_eq!(body["subscriptionId"], json!(sub_id));
        assert_eq!(body["value"], json!(7));
        assert_eq!(body["timestamp"], json!(1234));

        pump.stop().await;
    }

    #[tokio::test]
    async fn test_pump_fans_out_to_every_subscription() {
        let engine = Arc::new(SubscriptionEngine::new());
        let sink = Arc::new(RecordingSink::default());
        let pump = SubscriptionPump::start(engine.clone(), sink.clone());

        engine.subscribe("uuid-1", 1);
        engine.subscribe("uuid-1", 2);
        engine.publish("uuid-1", &json!(true), 99);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut conns: Vec<u32> = sink.messages().iter().map(|(c, _)| *c).collect();
        conns.sort_unstable();
        assert_eq!(conns, vec![1, 2]);

        pump.stop().await;
    }

    #[tokio::test]
    async fn test_nothing_delivered_after_stop() {
        let engine = Arc::new(SubscriptionEngine::new());
        let sink = Arc::new(RecordingSink::default());
        let pump = SubscriptionPump::start(engine.clone(), sink.clone());
        pump.stop().await;

        engine.subscribe("uuid-1", 1);
        engine.publish("uuid-1", &json!(7), 1234);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_gets_nothing() {
        let engine = Arc::new(SubscriptionEngine::new());
        let sink = Arc::new(RecordingSink::default());

        engine.subscribe("uuid-1", 1);
        engine.publish("uuid-1", &json!(7), 1234);
        engine.unsubscribe_all(1);

        let pump = SubscriptionPump::start(engine.clone(), sink.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sink.messages().is_empty());

        pump.stop().await;
    }
}
