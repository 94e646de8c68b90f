//! Node configuration.
//!
//! Sources are layered with `figment`, later ones overriding earlier ones:
//! built-in defaults, an optional TOML file, `REPLIKV_*` environment variables,
//! and finally command-line flags.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::topology::NodeId;

pub const ENV_PREFIX: &str = "REPLIKV_";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// This node's own URL, as the other nodes know it.
    pub node: String,
    /// Every node URL in the cluster. `node` is added if missing.
    pub cluster: Vec<String>,
    /// Persistent storage directory. Without one the node keeps data in memory.
    pub data_dir: Option<PathBuf>,
    pub peer_timeout_ms: u64,
    /// Request body cap, i.e. the largest value a PUT may carry. Unset means
    /// unbounded.
    pub max_value_bytes: Option<usize>,
    /// Runtime worker threads.
    pub workers: usize,
    pub log_level: String,
    /// `pretty` or `json`.
    pub log_format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            node: "http://127.0.0.1:8080".to_string(),
            cluster: Vec::new(),
            data_dir: None,
            peer_timeout_ms: 500,
            max_value_bytes: None,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<SocketAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(rename = "cluster", skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl NodeConfig {
    /// The full provider stack, before extraction.
    pub fn figment(file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(NodeConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file_exact(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(file, overrides))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: NodeConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.trim().is_empty() {
            return Err(ConfigError::Invalid("`node` must not be empty".into()));
        }
        for url in std::iter::once(&self.node).chain(&self.cluster) {
            if !url.starts_with("http://") {
                return Err(ConfigError::Invalid(format!(
                    "node URL '{}' must start with http://",
                    url
                )));
            }
        }
        if self.peer_timeout_ms == 0 {
            return Err(ConfigError::Invalid("`peer_timeout_ms` must be positive".into()));
        }
        if self.max_value_bytes == Some(0) {
            return Err(ConfigError::Invalid("`max_value_bytes` must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("`workers` must be positive".into()));
        }
        Ok(())
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.node.trim())
    }

    /// Cluster membership including this node, duplicates removed.
    pub fn cluster_nodes(&self) -> Vec<NodeId> {
        let nodes: BTreeSet<NodeId> = self
            .cluster
            .iter()
            .map(|url| NodeId::new(url.trim()))
            .chain(std::iter::once(self.node_id()))
            .collect();
        nodes.into_iter().collect()
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}
