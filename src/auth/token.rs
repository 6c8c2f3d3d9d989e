//! Token Verification
//!
//! Tokens are signed JWTs, RS256 by default. The decoding key is set at
//! server start from the configured public key file and can be replaced at
//! runtime, which the permission-manager flow relies on: the daemon returns
//! a fresh `pubkey` alongside the token it mints, and that key is installed
//! before the token is validated.
//!
//! # Claims
//!
//! ```json
//! {
//!   "exp": 1767225600,
//!   "modifyTree": false,
//!   "kuksa-vss": { "Vehicle.Speed": "rw", "Vehicle.**": "r" }
//! }
//! ```
//!
//! Verification failures never propagate as errors to the wire directly;
//! `install` folds them into the TTL convention of the protocol, where -1
//! means the token was rejected.

use std::sync::RwLock;

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::channel::Channel;
use crate::auth::permissions::PermissionSet;
use crate::error::ServerError;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, Unix seconds
    pub exp: i64,
    /// Path glob to rights mapping
    #[serde(rename = "kuksa-vss", default)]
    pub vss: Map<String, Value>,
    /// Whether the bearer may patch signal metadata
    #[serde(rename = "modifyTree", default)]
    pub modify_tree: bool,
}

/// Verifies tokens and installs their claims on channels
pub struct Authenticator {
    algorithm: Algorithm,
    key: RwLock<Option<DecodingKey>>,
}

impl Authenticator {
    /// An authenticator with no key installed; every token is rejected
    /// until `update_pub_key` succeeds
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            key: RwLock::new(None),
        }
    }

    /// An authenticator with key material installed up front
    pub fn with_key_material(algorithm: Algorithm, material: &str) -> Result<Self, ServerError> {
        let key = build_decoding_key(algorithm, material)?;
        Ok(Self {
            algorithm,
            key: RwLock::new(Some(key)),
        })
    }

    /// Replace the decoding key at runtime
    ///
    /// Empty key material is ignored, matching the wire flow where the
    /// plain `authorize` action passes no replacement key. Malformed key
    /// material is logged and leaves the previous key installed.
    pub fn update_pub_key(&self, material: &str) {
        if material.is_empty() {
            return;
        }
        match build_decoding_key(self.algorithm, material) {
            Ok(key) => {
                *self.key.write().unwrap() = Some(key);
                tracing::info!("[Auth] decoding key replaced");
            }
            Err(e) => {
                tracing::warn!("[Auth] rejected replacement key: {}", e);
            }
        }
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify(&self, token: &str) -> Result<Claims, ServerError> {
        let guard = self.key.read().unwrap();
        let key = guard
            .as_ref()
            .ok_or_else(|| ServerError::invalid_token("no public key installed"))?;

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ServerError::invalid_token(format!("token verification failed: {}", e)))
    }

    /// Verify a token and project its claims onto the channel
    ///
    /// Returns the remaining TTL in seconds, or -1 when verification fails
    /// for any reason. A rejected token also clears whatever authorization
    /// the channel previously held.
    pub fn install(&self, channel: &mut Channel, token: &str) -> i64 {
        let claims = match self.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("[Auth] token rejected for connection {}: {}", channel.conn_id, e);
                channel.deauthorize();
                return -1;
            }
        };

        let now = Utc::now().timestamp();
        let ttl = claims.exp - now;
        if ttl <= 0 {
            channel.deauthorize();
            return -1;
        }

        channel.authorized = true;
        channel.modify_tree = claims.modify_tree;
        channel.permissions = PermissionSet::from_claims(&claims.vss);
        channel.token_expiry = claims.exp;
        tracing::info!(
            "[Auth] token installed for connection {}, TTL {}s",
            channel.conn_id,
            ttl
        );
        ttl
    }

    /// Whether the channel's installed token is still valid
    pub fn is_still_valid(&self, channel: &Channel) -> bool {
        channel.token_valid(Utc::now().timestamp())
    }
}

fn build_decoding_key(algorithm: Algorithm, material: &str) -> Result<DecodingKey, ServerError> {
    match algorithm {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
            DecodingKey::from_rsa_pem(material.as_bytes())
                .map_err(|e| ServerError::invalid_token(format!("bad RSA public key: {}", e)))
        }
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            Ok(DecodingKey::from_secret(material.as_bytes()))
        }
        other => Err(ServerError::invalid_token(format!(
            "unsupported token algorithm {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn mint(claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn hs256_authenticator() -> Authenticator {
        Authenticator::with_key_material(Algorithm::HS256, SECRET).unwrap()
    }

    fn claims_with_exp(exp: i64) -> Claims {
        let mut vss = Map::new();
        vss.insert("Vehicle.**".to_string(), json!("rw"));
        Claims {
            exp,
            vss,
            modify_tree: false,
        }
    }

    #[test]
    fn test_install_valid_token() {
        let auth = hs256_authenticator();
        let mut channel = Channel::new(7);
        let exp = Utc::now().timestamp() + 3600;
        let ttl = auth.install(&mut channel, &mint(&claims_with_exp(exp)));

        assert!(ttl > 3590 && ttl <= 3600);
        assert!(channel.authorized);
        assert!(channel.can_write("Vehicle.Speed", Utc::now().timestamp()));
    }

    #[test]
    fn test_expired_token_yields_minus_one() {
        let auth = hs256_authenticator();
        let mut channel = Channel::new(7);
        let exp = Utc::now().timestamp() - 1;
        let ttl = auth.install(&mut channel, &mint(&claims_with_exp(exp)));

        assert_eq!(ttl, -1);
        assert!(!channel.authorized);
    }

    #[test]
    fn test_garbage_token_yields_minus_one() {
        let auth = hs256_authenticator();
        let mut channel = Channel::new(7);
        assert_eq!(auth.install(&mut channel, "not-a-jwt"), -1);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let auth = Authenticator::with_key_material(Algorithm::HS256, "other-secret").unwrap();
        let mut channel = Channel::new(7);
        let exp = Utc::now().timestamp() + 3600;
        assert_eq!(auth.install(&mut channel, &mint(&claims_with_exp(exp))), -1);
    }

    #[test]
    fn test_no_key_rejects_everything() {
        let auth = Authenticator::new(Algorithm::HS256);
        assert!(auth.verify("anything").is_err());
    }

    #[test]
    fn test_rejected_token_clears_previous_authorization() {
        let auth = hs256_authenticator();
        let mut channel = Channel::new(7);
        let exp = Utc::now().timestamp() + 3600;
        auth.install(&mut channel, &mint(&claims_with_exp(exp)));
        assert!(channel.authorized);

        auth.install(&mut channel, "garbage");
        assert!(!channel.authorized);
    }

    #[test]
    fn test_modify_tree_claim_projected() {
        let auth = hs256_authenticator();
        let mut channel = Channel::new(7);
        let mut claims = claims_with_exp(Utc::now().timestamp() + 60);
        claims.modify_tree = true;
        auth.install(&mut channel, &mint(&claims));
        assert!(channel.modify_tree);
    }
}
