//! Cluster Topology Module
//!
//! A fixed, statically configured node set. Every process sorts the same node
//! URLs into the same canonical order, so key placement agrees cluster-wide
//! without any coordination.
//!
//! ## Core Concepts
//! - **Placement**: `crc32(key) mod |nodes|` picks the primary.
//! - **Replica set**: the primary followed by its successors on the ring.
//! - **Static membership**: the node set never changes during a process lifetime,
//!   so there are no virtual nodes and no rebalancing.

pub mod ring;
pub mod types;

pub use ring::Topology;
pub use types::NodeId;
