//! Replicated Key-Value Store Library
//!
//! A statically configured cluster of nodes, each owning a local ordered
//! key-value store. Every key lives on a replica set of `from` nodes; a request
//! succeeds once `ack` of them answer, and conflicting replicas are resolved
//! by newest timestamp. The binary (`main.rs`) wires these modules into a node.
//!
//! ## Architecture Modules
//!
//! - **`record`**: The timestamped record every replica stores and exchanges,
//!   with tombstones standing in for deletes.
//! - **`topology`**: Node identity and deterministic key placement.
//! - **`storage`**: The local engine contract, with in-memory and fjall backends.
//! - **`coordinator`**: Quorum fan-out, waiting and conflict resolution.
//! - **`service`**: The HTTP boundary shared by clients and peer nodes.
//! - **`config`** / **`error`**: Node settings and the shared error type.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod record;
pub mod service;
pub mod storage;
pub mod topology;
