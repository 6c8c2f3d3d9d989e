//! Request Validation
//!
//! Each action has a typed request body; deserializing the incoming JSON
//! into it is the validation step. Missing or mistyped fields surface as
//! schema errors carrying serde's message, with the request id salvaged
//! from the raw JSON where possible so clients can correlate the failure.
//!
//! The two wire dialects disagree on the type of `requestId` (integer in
//! the legacy form, string in the newer one), so it is carried as a raw
//! JSON value restricted to those two shapes and echoed verbatim.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ServerError;

/// Request correlation id: a JSON number or string, echoed verbatim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestId(Value);

impl RequestId {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Number(_) | Value::String(_) => Ok(Self(value)),
            other => Err(serde::de::Error::custom(format!(
                "requestId must be a number or a string, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub tokens: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct KuksaAuthorizeRequest {
    pub clientid: String,
    pub secret: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct GetRequest {
    pub path: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub path: String,
    pub value: Value,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub path: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: u64,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct GetMetadataRequest {
    pub path: String,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMetadataRequest {
    pub path: String,
    pub metadata: Map<String, Value>,
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
}

/// Validate a raw request against an action's typed body
pub fn validate<T: DeserializeOwned>(root: &Value) -> Result<T, ServerError> {
    serde_json::from_value(root.clone()).map_err(|e| ServerError::schema(e.to_string()))
}

/// Salvage the request id from a raw (possibly invalid) request
pub fn try_extract_request_id(root: &Value) -> Option<Value> {
    match root.get("requestId") {
        Some(id @ (Value::Number(_) | Value::String(_))) => Some(id.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_get_request() {
        let root = json!({"action": "get", "path": "Vehicle.Speed", "requestId": 1});
        let req: GetRequest = validate(&root).unwrap();
        assert_eq!(req.path, "Vehicle.Speed");
        assert_eq!(req.request_id.as_value(), &json!(1));
    }

    #[test]
    fn test_validate_accepts_string_request_id() {
        let root = json!({"action": "get", "path": "Vehicle.Speed", "requestId": "8756"});
        let req: GetRequest = validate(&root).unwrap();
        assert_eq!(req.request_id.as_value(), &json!("8756"));
    }

    #[test]
    fn test_validate_rejects_missing_path() {
        let root = json!({"action": "get", "requestId": 1});
        let err = validate::<GetRequest>(&root).unwrap_err();
        assert!(matches!(err, ServerError::Schema { .. }));
    }

    #[test]
    fn test_validate_rejects_object_request_id() {
        let root = json!({"action": "get", "path": "a", "requestId": {"nested": true}});
        assert!(validate::<GetRequest>(&root).is_err());
    }

    #[test]
    fn test_try_extract_request_id_salvages() {
        let root = json!({"action": "set", "requestId": 4});
        assert_eq!(try_extract_request_id(&root), Some(json!(4)));
        let root = json!({"action": "set", "requestId": [1]});
        assert_eq!(try_extract_request_id(&root), None);
        let root = json!({"action": "set"});
        assert_eq!(try_extract_request_id(&root), None);
    }

    #[test]
    fn test_set_request_keeps_raw_value() {
        let root = json!({
            "action": "set",
            "path": "Vehicle.Acceleration.*",
            "value": [{"Lateral": 0.1}],
            "requestId": 2
        });
        let req: SetRequest = validate(&root).unwrap();
        assert!(req.value.is_array());
    }
}
