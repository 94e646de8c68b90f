//! Replica Coordination Module
//!
//! Executes one client operation against the replica set of its key and turns
//! the replicas' answers into a single result.
//!
//! ## Request lifecycle
//! 1. **Placement**: `Topology::replicas_for(key, from)` picks the `from` replicas.
//! 2. **Fan-out**: one task per replica. The local replica applies the operation to
//!    the storage engine; peers receive it as a *proxied* request, which they
//!    execute locally without fanning out again.
//! 3. **Quorum wait**: the caller is released as soon as `ack` replicas succeed,
//!    or once all `from` replicas have reported. Stragglers keep running; their
//!    answers are discarded.
//! 4. **Resolution**: the record with the greatest timestamp wins.
//!
//! Failed sub-operations are logged and simply do not count. Nothing is retried
//! and nothing is rolled back, so a write that reached fewer than `ack` replicas
//! stays on those replicas even though the client sees `InsufficientReplicas`.

pub mod coordinator;
pub mod local;
pub mod pending;
pub mod transport;
pub mod types;

pub use coordinator::ReplicaCoordinator;
pub use local::LocalReplica;
pub use transport::{HttpPeerClient, PeerTransport};
pub use types::{Operation, Outcome, ReplicationFactor};
