use super::types::NodeId;
use crate::error::StoreError;

/// Immutable key → replica-set mapping over a canonically ordered node list.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<NodeId>,
    local: NodeId,
}

impl Topology {
    /// Sorts and deduplicates `nodes`. The local node must be one of them.
    pub fn new(
        nodes: impl IntoIterator<Item = NodeId>,
        local: NodeId,
    ) -> Result<Self, StoreError> {
        let mut nodes: Vec<NodeId> = nodes.into_iter().collect();
        nodes.sort();
        nodes.dedup();

        if nodes.is_empty() {
            return Err(StoreError::InvalidTopology("node set is empty".into()));
        }
        if !nodes.contains(&local) {
            return Err(StoreError::InvalidTopology(format!(
                "local node {} is not part of the cluster",
                local
            )));
        }

        Ok(Self { nodes, local })
    }

    /// Single-node topology, used when no peers are configured.
    pub fn standalone(local: NodeId) -> Self {
        Self {
            nodes: vec![local.clone()],
            local,
        }
    }

    pub fn all_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn local_node(&self) -> &NodeId {
        &self.local
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_standalone(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn is_self(&self, node: &NodeId) -> bool {
        node == &self.local
    }

    pub fn peers(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().filter(move |node| !self.is_self(node))
    }

    pub fn primary_for(&self, key: &[u8]) -> &NodeId {
        &self.nodes[self.start_index(key)]
    }

    /// The `count` nodes responsible for `key`, primary first.
    ///
    /// `count` larger than the cluster wraps around the ring and repeats nodes.
    pub fn replicas_for(&self, key: &[u8], count: usize) -> Vec<NodeId> {
        let start = self.start_index(key);
        (0..count)
            .map(|i| self.nodes[(start + i) % self.nodes.len()].clone())
            .collect()
    }

    fn start_index(&self, key: &[u8]) -> usize {
        key_hash(key) as usize % self.nodes.len()
    }
}

/// Stable across processes, platforms and compiler versions.
pub fn key_hash(key: &[u8]) -> u32 {
    crc32fast::hash(key)
}
