//! Server Initialization
//!
//! `create_app` wires the subsystems together: load the VSS document into
//! the store, build the authenticator from the configured key, start the
//! subscription pump against the connection registry, and hand the
//! assembled state to the router.
//!
//! A missing spec document is fatal; a missing public key is not, the
//! server just rejects every token until one arrives through the
//! permission-manager flow.

use std::sync::Arc;

use axum::Router;

use crate::auth::perm_client::PermClient;
use crate::auth::Authenticator;
use crate::error::ServerError;
use crate::protocol::CommandProcessor;
use crate::routes::create_router;
use crate::server::config::ServerConfig;
use crate::server::state::{AppState, ChannelRegistry};
use crate::signals::SignalStore;
use crate::subscription::{SubscriptionEngine, SubscriptionPump};

/// Build the application and start its background work
pub async fn create_app(config: &ServerConfig) -> Result<Router, ServerError> {
    tracing::info!("[Server] initializing signal server");

    // Step 1: load the VSS spec document into the store
    let spec_bytes = std::fs::read(&config.spec_file)
        .map_err(|e| ServerError::spec_load(format!("{}: {}", config.spec_file, e)))?;
    let store = Arc::new(SignalStore::new());
    store.load(&spec_bytes).await?;
    tracing::info!("[Server] VSS tree loaded from {}", config.spec_file);

    // Step 2: authenticator with the configured public key
    let authenticator = match config.load_public_key() {
        Some(material) => Authenticator::with_key_material(config.algorithm, &material)?,
        None => {
            tracing::warn!(
                "[Server] no public key configured; tokens are rejected until one is installed"
            );
            Authenticator::new(config.algorithm)
        }
    };
    let authenticator = Arc::new(authenticator);

    // Step 3: subscription engine and the pump that delivers through the
    // connection registry
    let engine = Arc::new(SubscriptionEngine::new());
    let registry = Arc::new(ChannelRegistry::new());
    // The pump runs for the whole process lifetime; dropping the handle
    // detaches the task without stopping it.
    let _pump = SubscriptionPump::start(engine.clone(), registry.clone());

    // Step 4: command processor
    let mut processor = CommandProcessor::new(store.clone(), authenticator.clone(), engine.clone());
    if let Some(url) = &config.perm_manager_url {
        tracing::info!("[Server] permission manager at {}", url);
        processor = processor.with_perm_client(PermClient::new(url.clone()));
    }

    let state = AppState {
        store,
        engine,
        registry,
        processor: Arc::new(processor),
    };
    Ok(create_router(state))
}
