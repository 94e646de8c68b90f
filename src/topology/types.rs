use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a cluster node: its base HTTP URL, e.g. `http://10.0.0.1:8080`.
///
/// Ordering is plain string ordering; it defines the canonical ring order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    /// Builds an id, dropping any trailing `/` so `http://a:1/` and `http://a:1`
    /// name the same node.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(url.trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(url: &str) -> Self {
        NodeId::new(url)
    }
}
