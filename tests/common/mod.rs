//! Shared test helpers
//!
//! Builders for a loaded server core (store + authenticator + engine +
//! processor), token minting against a fixed HS256 secret, and a recording
//! notification sink standing in for the transport.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

use vss_broker::auth::{Authenticator, Channel, Claims};
use vss_broker::protocol::CommandProcessor;
use vss_broker::signals::SignalStore;
use vss_broker::subscription::{NotificationSink, SubscriptionEngine};

pub const TEST_SECRET: &str = "integration-test-secret";

/// A VSS document exercising every datatype family the tests need
pub fn sample_spec() -> Vec<u8> {
    json!({
        "Vehicle": {
            "type": "branch",
            "description": "High-level vehicle data",
            "children": {
                "Speed": {
                    "type": "sensor",
                    "datatype": "Int32",
                    "unit": "km/h",
                    "uuid": "speed-uuid"
                },
                "VIN": {
                    "type": "attribute",
                    "datatype": "String",
                    "uuid": "vin-uuid"
                },
                "Acceleration": {
                    "type": "branch",
                    "children": {
                        "Lateral": { "type": "sensor", "datatype": "Float", "uuid": "accel-lat" },
                        "Longitudinal": { "type": "sensor", "datatype": "Float", "uuid": "accel-lon" },
                        "Vertical": { "type": "sensor", "datatype": "Float", "uuid": "accel-ver" }
                    }
                },
                "Cabin": {
                    "type": "branch",
                    "children": {
                        "DoorCount": { "type": "attribute", "datatype": "UInt8", "uuid": "door-uuid" }
                    }
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// The server core without the socket transport
pub struct TestServer {
    pub store: Arc<SignalStore>,
    pub engine: Arc<SubscriptionEngine>,
    pub processor: CommandProcessor,
}

pub async fn test_server() -> TestServer {
    let store = Arc::new(SignalStore::new());
    store.load(&sample_spec()).await.expect("spec loads");
    let authenticator =
        Arc::new(Authenticator::with_key_material(Algorithm::HS256, TEST_SECRET).expect("key"));
    let engine = Arc::new(SubscriptionEngine::new());
    let processor = CommandProcessor::new(store.clone(), authenticator, engine.clone());
    TestServer {
        store,
        engine,
        processor,
    }
}

/// Mint a token over the shared test secret
pub fn mint_token(globs: &[(&str, &str)], exp: i64, modify_tree: bool) -> String {
    let mut vss = Map::new();
    for (glob, rights) in globs {
        vss.insert(glob.to_string(), json!(rights));
    }
    let claims = Claims {
        exp,
        vss,
        modify_tree,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

/// Authorize a channel through the wire protocol
pub async fn authorize(server: &TestServer, channel: &mut Channel, globs: &[(&str, &str)]) {
    let token = mint_token(globs, Utc::now().timestamp() + 3600, false);
    let request = json!({"action": "authorize", "tokens": token, "requestId": 1000}).to_string();
    let response = server.processor.process(channel, &request).await;
    let parsed = parse(&response);
    assert!(
        parsed.get("error").is_none(),
        "authorize failed: {}",
        response
    );
}

/// Run one request through the processor and parse the response
pub async fn roundtrip(server: &TestServer, channel: &mut Channel, request: Value) -> Value {
    let response = server.processor.process(channel, &request.to_string()).await;
    parse(&response)
}

pub fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).expect("response is JSON")
}

/// Notification sink capturing what the transport would send
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(u32, String)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<(u32, Value)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(conn_id, raw)| (*conn_id, parse(raw)))
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, conn_id: u32, message: String) {
        self.sent.lock().unwrap().push((conn_id, message));
    }
}
