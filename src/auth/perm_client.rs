//! Permission-Manager Client
//!
//! The `kuksa-authorize` action lets a client trade `(clientid, secret)`
//! credentials for a token minted by an out-of-process permission-manager
//! daemon. The daemon's response carries both the token and the public key
//! it was signed with; the caller installs the key before validating the
//! token.
//!
//! Any transport or decode failure is an `UpstreamUnavailable` error, which
//! the processor surfaces as a 501.

use serde::Deserialize;

use crate::error::ServerError;

/// Response of the permission-manager token exchange
#[derive(Debug, Clone, Deserialize)]
pub struct PermTokenResponse {
    pub token: String,
    pub pubkey: String,
}

/// HTTP client for the permission-manager daemon
pub struct PermClient {
    endpoint: String,
    http: reqwest::Client,
}

impl PermClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Exchange client credentials for a signed token
    pub async fn request_token(
        &self,
        client_id: &str,
        secret: &str,
    ) -> Result<PermTokenResponse, ServerError> {
        let body = serde_json::json!({
            "clientid": client_id,
            "secret": secret,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ServerError::upstream(format!("permission manager unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServerError::upstream(format!(
                "permission manager returned status {}",
                response.status()
            )));
        }

        response.json::<PermTokenResponse>().await.map_err(|e| {
            ServerError::upstream(format!("bad permission manager response: {}", e))
        })
    }
}
