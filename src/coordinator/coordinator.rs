use bytes::Bytes;
use std::sync::Arc;
use tracing::Instrument;

use super::local::LocalReplica;
use super::pending::{PendingOperation, ReplySlot};
use super::transport::{HttpPeerClient, PeerTransport};
use super::types::{Operation, Outcome, ReplicationFactor};
use crate::error::StoreError;
use crate::record::{TimestampedRecord, latest_of};
use crate::storage::StorageEngine;
use crate::topology::{NodeId, Topology};

/// Runs client operations against their replica sets.
///
/// One coordinator per process. Policy (the `ack/from` factor, local vs proxied
/// execution) is chosen per request, not per coordinator.
pub struct ReplicaCoordinator<T = HttpPeerClient> {
    topology: Arc<Topology>,
    local: LocalReplica,
    peers: Arc<T>,
}

impl<T: PeerTransport> ReplicaCoordinator<T> {
    pub fn new(topology: Topology, engine: Arc<dyn StorageEngine>, peers: T) -> Self {
        Self {
            topology: Arc::new(topology),
            local: LocalReplica::new(engine),
            peers: Arc::new(peers),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn local(&self) -> &LocalReplica {
        &self.local
    }

    /// Majority of the whole cluster.
    pub fn default_replication(&self) -> ReplicationFactor {
        ReplicationFactor::majority(self.topology.len())
    }

    /// Entry point for client requests.
    ///
    /// `replicas == None` uses [`Self::default_replication`]. An invalid factor
    /// is rejected before anything is dispatched. When the whole replica set is
    /// this node the operation runs inline; otherwise it is fanned out.
    pub async fn execute(
        &self,
        op: Operation,
        key: Bytes,
        replicas: Option<ReplicationFactor>,
    ) -> Result<Outcome, StoreError> {
        let replicas = replicas.unwrap_or_else(|| self.default_replication());
        replicas.validate(self.topology.len())?;

        let replica_set = self.topology.replicas_for(&key, replicas.from);
        if let [only] = replica_set.as_slice()
            && self.topology.is_self(only)
        {
            return self.execute_single(op, key).await;
        }

        self.fan_out(op, key, replicas, replica_set).await
    }

    /// Handles a request another node forwarded here: local execution only,
    /// never a further fan-out.
    pub async fn serve_proxied(
        &self,
        op: Operation,
        key: Bytes,
    ) -> Result<TimestampedRecord, StoreError> {
        self.local.apply(&op, &key).await
    }

    async fn execute_single(&self, op: Operation, key: Bytes) -> Result<Outcome, StoreError> {
        if self.topology.is_standalone() && op == Operation::Delete {
            self.local.remove(&key).await?;
            return Ok(Outcome::Accepted);
        }

        let record = self.local.apply(&op, &key).await?;
        Ok(Outcome::resolve(&op, Some(&record)))
    }

    async fn fan_out(
        &self,
        op: Operation,
        key: Bytes,
        replicas: ReplicationFactor,
        replica_set: Vec<NodeId>,
    ) -> Result<Outcome, StoreError> {
        let op_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "coordinate",
            %op_id,
            op = op.name(),
            ack = replicas.ack,
            from = replicas.from
        );

        async move {
            let pending = PendingOperation::new(replicas.ack, replicas.from);
            for node in replica_set {
                self.dispatch(node, &op, &key, pending.slot());
            }

            pending.wait().await;
            let records = pending.take_records();

            if records.len() < replicas.ack {
                tracing::warn!(
                    successes = records.len(),
                    reported = pending.reported(),
                    "quorum not reached"
                );
                return Err(StoreError::InsufficientReplicas {
                    needed: replicas.ack,
                    got: records.len(),
                });
            }

            let winner = latest_of(&records);
            tracing::debug!(
                successes = records.len(),
                winner_ts = winner.map(|r| r.timestamp()),
                "quorum reached"
            );
            Ok(Outcome::resolve(&op, winner))
        }
        .instrument(span)
        .await
    }

    /// Spawns one sub-operation. Failures are logged here and only reported
    /// as a miss.
    fn dispatch(&self, node: NodeId, op: &Operation, key: &Bytes, slot: ReplySlot) {
        let op = op.clone();
        let key = key.clone();

        if self.topology.is_self(&node) {
            let local = self.local.clone();
            tokio::spawn(
                async move {
                    match local.apply(&op, &key).await {
                        Ok(record) => slot.succeed(record),
                        Err(e) => {
                            tracing::warn!(node = %node, error = %e, "local sub-operation failed");
                            slot.fail();
                        }
                    }
                }
                .in_current_span(),
            );
        } else {
            let peers = self.peers.clone();
            tokio::spawn(
                async move {
                    match peers.forward(&node, &op, &key).await {
                        Ok(record) => {
                            tracing::trace!(node = %node, "peer sub-operation succeeded");
                            slot.succeed(record);
                        }
                        Err(e) => {
                            tracing::warn!(node = %node, error = %e, "peer sub-operation failed");
                            slot.fail();
                        }
                    }
                }
                .in_current_span(),
            );
        }
    }
}
