//! Server Configuration
//!
//! Configuration comes from environment variables with development-friendly
//! defaults. Values are read once at startup; missing optional pieces are
//! logged and the server starts without them (a server without a public key
//! rejects every token until the permission-manager flow installs one).
//!
//! # Variables
//!
//! - `VSS_SPEC_FILE` - VSS JSON document, default `vss_rel_1.0.json`
//! - `SERVER_PORT` - listening port, default 8090
//! - `JWT_PUBLIC_KEY_FILE` - PEM public key for token verification
//! - `JWT_ALGORITHM` - token algorithm, default `RS256`
//! - `PERM_MANAGER_URL` - endpoint of the permission-manager daemon

use std::str::FromStr;

use jsonwebtoken::Algorithm;

/// Startup configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub spec_file: String,
    pub port: u16,
    pub public_key_file: Option<String>,
    pub algorithm: Algorithm,
    pub perm_manager_url: Option<String>,
}

impl ServerConfig {
    /// Read configuration from the environment
    pub fn from_env() -> Self {
        let spec_file =
            std::env::var("VSS_SPEC_FILE").unwrap_or_else(|_| "vss_rel_1.0.json".to_string());

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(8090);

        let public_key_file = std::env::var("JWT_PUBLIC_KEY_FILE").ok();
        if public_key_file.is_none() {
            tracing::warn!("[Config] JWT_PUBLIC_KEY_FILE not set");
        }

        let algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(raw) => Algorithm::from_str(&raw).unwrap_or_else(|_| {
                tracing::warn!("[Config] unknown JWT_ALGORITHM {:?}, using RS256", raw);
                Algorithm::RS256
            }),
            Err(_) => Algorithm::RS256,
        };

        let perm_manager_url = std::env::var("PERM_MANAGER_URL").ok();

        Self {
            spec_file,
            port,
            public_key_file,
            algorithm,
            perm_manager_url,
        }
    }

    /// Read the configured public key file, if any
    ///
    /// Read failures are logged and treated as no key configured.
    pub fn load_public_key(&self) -> Option<String> {
        let path = self.public_key_file.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(material) => Some(material),
            Err(e) => {
                tracing::error!("[Config] failed to read public key {}: {}", path, e);
                None
            }
        }
    }
}
