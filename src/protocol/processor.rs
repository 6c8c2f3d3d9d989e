//! Command Processor
//!
//! One instance dispatches every request of every connection. Processing a
//! request is always the same shape: parse the JSON, validate the typed
//! body for the action, run the handler, and map any failure onto the wire
//! error envelope. Handlers return `ServerError`; this module is the only
//! place where error kinds meet numeric codes, and no failure propagates
//! past it to the transport.

use std::sync::Arc;

use serde_json::Value;

use crate::auth::perm_client::PermClient;
use crate::auth::{Authenticator, Channel};
use crate::error::ServerError;
use crate::protocol::requests::{
    self, AuthorizeRequest, GetMetadataRequest, GetRequest, KuksaAuthorizeRequest, SetRequest,
    SubscribeRequest, UnsubscribeRequest, UpdateMetadataRequest,
};
use crate::protocol::responses;
use crate::signals::{SignalStore, VssPath};
use crate::subscription::SubscriptionEngine;

/// Parses, authorizes, and dispatches client requests
pub struct CommandProcessor {
    store: Arc<SignalStore>,
    authenticator: Arc<Authenticator>,
    engine: Arc<SubscriptionEngine>,
    perm_client: Option<PermClient>,
}

impl CommandProcessor {
    pub fn new(
        store: Arc<SignalStore>,
        authenticator: Arc<Authenticator>,
        engine: Arc<SubscriptionEngine>,
    ) -> Self {
        Self {
            store,
            authenticator,
            engine,
            perm_client: None,
        }
    }

    /// Enable the `kuksa-authorize` action
    pub fn with_perm_client(mut self, client: PermClient) -> Self {
        self.perm_client = Some(client);
        self
    }

    /// Process one raw request and produce the response message
    pub async fn process(&self, channel: &mut Channel, raw: &str) -> String {
        let root: Value = match serde_json::from_str(raw) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(
                    "[Protocol] malformed request from connection {}: {}",
                    channel.conn_id,
                    e
                );
                return responses::error(None, None, &ServerError::schema(e.to_string()));
            }
        };

        let request_id = requests::try_extract_request_id(&root);
        let action = match root.get("action").and_then(Value::as_str) {
            Some(action) => action.to_string(),
            None => {
                return responses::error(
                    None,
                    request_id,
                    &ServerError::schema("request carries no action"),
                );
            }
        };

        match self.dispatch(channel, &action, &root).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    "[Protocol] {} failed for connection {}: {}",
                    action,
                    channel.conn_id,
                    err
                );
                responses::error(Some(&action), request_id, &err)
            }
        }
    }

    async fn dispatch(
        &self,
        channel: &mut Channel,
        action: &str,
        root: &Value,
    ) -> Result<String, ServerError> {
        match action {
            "authorize" => self.process_authorize(channel, root),
            "kuksa-authorize" => self.process_kuksa_authorize(channel, root).await,
            "get" => self.process_get(channel, root).await,
            "set" => self.process_set(channel, root).await,
            "subscribe" => self.process_subscribe(channel, root).await,
            "unsubscribe" => self.process_unsubscribe(root),
            "getMetadata" => self.process_get_metadata(root).await,
            "updateMetaData" => self.process_update_metadata(channel, root).await,
            other => Err(ServerError::schema(format!("Unknown action {}", other))),
        }
    }

    /// Guard for actions that require a valid installed token
    fn require_token(&self, channel: &Channel) -> Result<(), ServerError> {
        if !self.authenticator.is_still_valid(channel) {
            return Err(ServerError::invalid_token("Check the JWT token passed"));
        }
        Ok(())
    }

    fn process_authorize(
        &self,
        channel: &mut Channel,
        root: &Value,
    ) -> Result<String, ServerError> {
        let req: AuthorizeRequest = requests::validate(root)?;
        let ttl = self.authenticator.install(channel, &req.tokens);
        if ttl < 0 {
            return Err(ServerError::invalid_token("Check the JWT token passed"));
        }
        let mut envelope = responses::success_base("authorize", req.request_id.as_value());
        envelope.insert("TTL".into(), Value::from(ttl));
        Ok(responses::finish(envelope))
    }

    async fn process_kuksa_authorize(
        &self,
        channel: &mut Channel,
        root: &Value,
    ) -> Result<String, ServerError> {
        let req: KuksaAuthorizeRequest = requests::validate(root)?;
        let client = self.perm_client.as_ref().ok_or_else(|| {
            ServerError::upstream("no permission management daemon configured")
        })?;

        let granted = client.request_token(&req.clientid, &req.secret).await?;
        // The daemon signs with a key of its own choosing; install it
        // before validating the token it minted.
        self.authenticator.update_pub_key(&granted.pubkey);
        let ttl = self.authenticator.install(channel, &granted.token);
        if ttl < 0 {
            return Err(ServerError::invalid_token("Check the JWT token passed"));
        }
        let mut envelope = responses::success_base("kuksa-authorize", req.request_id.as_value());
        envelope.insert("TTL".into(), Value::from(ttl));
        Ok(responses::finish(envelope))
    }

    async fn process_get(&self, channel: &Channel, root: &Value) -> Result<String, ServerError> {
        let req: GetRequest = requests::validate(root)?;
        self.require_token(channel)?;
        let path = VssPath::parse(&req.path)?;
        let answer = self.store.get_signal(channel, &path).await?;

        let mut envelope = responses::success_base("get", req.request_id.as_value());
        if let Value::Object(fields) = answer {
            // A single-leaf answer carries the signal's own timestamp,
            // which replaces the envelope's.
            for (key, value) in fields {
                envelope.insert(key, value);
            }
        }
        Ok(responses::finish(envelope))
    }

    async fn process_set(
        &self,
        channel: &mut Channel,
        root: &Value,
    ) -> Result<String, ServerError> {
        let req: SetRequest = requests::validate(root)?;
        self.require_token(channel)?;
        let path = VssPath::parse(&req.path)?;
        let updates = self.store.set_signal(channel, &path, req.value).await?;

        // The tree lock is released; fan out to subscribers.
        for update in updates {
            self.engine
                .publish(&update.uuid, &update.value, update.timestamp);
        }
        Ok(responses::finish(responses::success_base(
            "set",
            req.request_id.as_value(),
        )))
    }

    async fn process_subscribe(
        &self,
        channel: &Channel,
        root: &Value,
    ) -> Result<String, ServerError> {
        let req: SubscribeRequest = requests::validate(root)?;
        self.require_token(channel)?;
        let path = VssPath::parse(&req.path)?;
        let (uuid, dotted) = self.store.resolve_subscription(channel, &path).await?;
        let sub_id = self.engine.subscribe(&uuid, channel.conn_id);
        tracing::info!(
            "[Protocol] connection {} subscribed to {}",
            channel.conn_id,
            dotted
        );

        let mut envelope = responses::success_base("subscribe", req.request_id.as_value());
        envelope.insert("subscriptionId".into(), Value::from(sub_id));
        Ok(responses::finish(envelope))
    }

    fn process_unsubscribe(&self, root: &Value) -> Result<String, ServerError> {
        let req: UnsubscribeRequest = requests::validate(root)?;
        self.engine.unsubscribe(req.subscription_id);

        let mut envelope = responses::success_base("unsubscribe", req.request_id.as_value());
        envelope.insert("subscriptionId".into(), Value::from(req.subscription_id));
        Ok(responses::finish(envelope))
    }

    async fn process_get_metadata(&self, root: &Value) -> Result<String, ServerError> {
        let req: GetMetadataRequest = requests::validate(root)?;
        let path = VssPath::parse(&req.path)?;
        let metadata = self.store.get_metadata(&path).await?;

        let mut envelope = responses::success_base("getMetadata", req.request_id.as_value());
        envelope.insert("metadata".into(), metadata);
        Ok(responses::finish(envelope))
    }

    async fn process_update_metadata(
        &self,
        channel: &Channel,
        root: &Value,
    ) -> Result<String, ServerError> {
        let req: UpdateMetadataRequest = requests::validate(root)?;
        let path = VssPath::parse(&req.path)?;
        self.store
            .update_metadata(channel, &path, &req.metadata)
            .await?;
        Ok(responses::finish(responses::success_base(
            "updateMetaData",
            req.request_id.as_value(),
        )))
    }
}
