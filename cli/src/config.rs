//! Server configuration: YAML file, then command-line / environment
//! overrides on top.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use chainstatus_api::{PublicConfig, ServerSettings};
use chainstatus_cache::SwrCacheConfig;
use chainstatus_observability::LogConfig;
use chainstatus_runtime::HttpRuntimeConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: SocketAddr,
    pub namespace: String,
    pub plugins: Vec<String>,
    pub runtime: RuntimeSection,
    pub cache: CacheSection,
    pub permissive_cors: bool,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
    /// `None` disables interval revalidation.
    pub revalidation_interval_secs: Option<u64>,
    pub proactively_initialize: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 4334)),
            namespace: "mainnet".into(),
            plugins: Vec::new(),
            runtime: RuntimeSection::default(),
            cache: CacheSection::default(),
            permissive_cors: false,
            log: LogConfig::default(),
        }
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:42069/indexing-facts".into(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: 5,
            revalidation_interval_secs: Some(10),
            proactively_initialize: true,
        }
    }
}

/// Command-line overrides. Each also reads a `CHAINSTATUS_*` variable.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Path to a YAML config file
    #[arg(short, long, env = "CHAINSTATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:4334
    #[arg(long, env = "CHAINSTATUS_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// URL of the indexing runtime's facts endpoint
    #[arg(long, env = "CHAINSTATUS_RUNTIME_URL")]
    pub runtime_url: Option<String>,

    #[arg(long, env = "CHAINSTATUS_NAMESPACE")]
    pub namespace: Option<String>,

    /// Active plugins (repeatable)
    #[arg(long = "plugin", env = "CHAINSTATUS_PLUGINS", value_delimiter = ',')]
    pub plugins: Vec<String>,

    /// Global log level
    #[arg(long, env = "CHAINSTATUS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, env = "CHAINSTATUS_LOG_JSON")]
    pub log_json: bool,
}

impl ServerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(listen) = overrides.listen {
            self.listen_address = listen;
        }
        if let Some(url) = &overrides.runtime_url {
            self.runtime.url = url.clone();
        }
        if let Some(namespace) = &overrides.namespace {
            self.namespace = namespace.clone();
        }
        if !overrides.plugins.is_empty() {
            self.plugins = overrides.plugins.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.log.level = level.clone();
        }
        if overrides.log_json {
            self.log.json = true;
        }
        self
    }

    pub fn cache_config(&self) -> SwrCacheConfig {
        SwrCacheConfig {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            proactive_revalidation_interval: self
                .cache
                .revalidation_interval_secs
                .map(Duration::from_secs),
            proactively_initialize: self.cache.proactively_initialize,
        }
    }

    pub fn runtime_config(&self) -> HttpRuntimeConfig {
        HttpRuntimeConfig {
            url: self.runtime.url.clone(),
            request_timeout: Duration::from_millis(self.runtime.timeout_ms),
        }
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            listen_address: self.listen_address,
            permissive_cors: self.permissive_cors,
        }
    }

    pub fn public_config(&self) -> PublicConfig {
        PublicConfig::new(self.namespace.clone(), self.plugins.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(ServerConfig::from_yaml("{}").unwrap(), ServerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ServerConfig::from_yaml(
            r#"
listen_address: "127.0.0.1:8080"
plugins: [subgraph, registrars]
cache:
  ttl_secs: 30
  revalidation_interval_secs: null
log:
  level: debug
  components:
    chainstatus_cache: trace
"#,
        )
        .unwrap();

        assert_eq!(config.listen_address, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.plugins, vec!["subgraph", "registrars"]);
        assert_eq!(config.namespace, "mainnet");
        assert_eq!(config.runtime, RuntimeSection::default());

        let cache = config.cache_config();
        assert_eq!(cache.ttl, Duration::from_secs(30));
        assert_eq!(cache.proactive_revalidation_interval, None);
        assert!(cache.proactively_initialize);
        assert_eq!(config.log.directives(), "debug,chainstatus_cache=trace");
    }

    #[test]
    fn overrides_win_over_file() {
        let overrides = Overrides {
            listen: Some(SocketAddr::from(([127, 0, 0, 1], 9000))),
            runtime_url: Some("http://indexer:42069/facts".into()),
            plugins: vec!["subgraph".into()],
            log_json: true,
            ..Overrides::default()
        };
        let config = ServerConfig::default().apply(&overrides);

        assert_eq!(config.server_settings().listen_address.port(), 9000);
        assert_eq!(config.runtime_config().url, "http://indexer:42069/facts");
        assert_eq!(config.public_config().plugins, vec!["subgraph"]);
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/chainstatus.yaml"))).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
