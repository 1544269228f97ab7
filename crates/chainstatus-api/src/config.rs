use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// What the server tells clients about itself. Never includes the indexing
/// runtime's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub version: String,
    pub namespace: String,
    /// Active plugins; handlers may require some of these.
    pub plugins: Vec<String>,
}

impl PublicConfig {
    pub fn new(namespace: impl Into<String>, plugins: Vec<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            namespace: namespace.into(),
            plugins,
        }
    }

    pub fn has_plugin(&self, plugin: &str) -> bool {
        self.plugins.iter().any(|p| p == plugin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub listen_address: SocketAddr,
    pub permissive_cors: bool,
}
