//! Response Shaping
//!
//! Builders for the canonical success and error envelopes. Every envelope
//! carries the echoed `action` and `requestId` (when known) plus a
//! Unix-seconds `timestamp`; error envelopes add the `error` object with
//! its stable numeric code and fixed reason string.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::ServerError;

/// Current Unix second, the timestamp stamped on every envelope
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Start a success envelope with action, request id, and timestamp
pub fn success_base(action: &str, request_id: &Value) -> Map<String, Value> {
    let mut envelope = Map::new();
    envelope.insert("action".into(), Value::from(action));
    envelope.insert("requestId".into(), request_id.clone());
    envelope.insert("timestamp".into(), Value::from(unix_timestamp()));
    envelope
}

/// Serialize a finished envelope
pub fn finish(envelope: Map<String, Value>) -> String {
    Value::Object(envelope).to_string()
}

/// Build an error envelope from an error kind
///
/// `action` and `request_id` are omitted when they could not be recovered
/// from the request, which is the shape malformed-JSON failures take.
pub fn error(action: Option<&str>, request_id: Option<Value>, err: &ServerError) -> String {
    let mut envelope = Map::new();
    if let Some(action) = action {
        envelope.insert("action".into(), Value::from(action));
    }
    if let Some(request_id) = request_id {
        envelope.insert("requestId".into(), request_id);
    }

    let mut body = Map::new();
    body.insert("number".into(), Value::from(err.wire_number()));
    body.insert("reason".into(), Value::from(err.wire_reason()));
    body.insert("message".into(), Value::from(err.to_string()));
    envelope.insert("error".into(), Value::Object(body));
    envelope.insert("timestamp".into(), Value::from(unix_timestamp()));
    Value::Object(envelope).to_string()
}
