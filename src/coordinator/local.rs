use bytes::Bytes;
use std::sync::Arc;

use super::types::Operation;
use crate::error::StoreError;
use crate::record::{TimestampedRecord, now_ms};
use crate::storage::StorageEngine;

/// This node's replica: applies operations to the local storage engine.
#[derive(Clone)]
pub struct LocalReplica {
    engine: Arc<dyn StorageEngine>,
}

impl LocalReplica {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    /// Applies `op` on the blocking pool and returns the record it read or wrote.
    pub async fn apply(
        &self,
        op: &Operation,
        key: &Bytes,
    ) -> Result<TimestampedRecord, StoreError> {
        let engine = self.engine.clone();
        let op = op.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || apply_to(engine.as_ref(), &op, &key))
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    /// Physical removal, only used when the node runs without peers.
    pub async fn remove(&self, key: &Bytes) -> Result<(), StoreError> {
        let engine = self.engine.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || engine.delete(&key))
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?
    }
}

/// Executes one operation against `engine`.
///
/// - GET decodes the stored record; a missing key is a confirmed absence and
///   yields [`TimestampedRecord::absent`] rather than an error.
/// - PUT and DELETE stamp a fresh record with the current time and store it.
pub fn apply_to(
    engine: &dyn StorageEngine,
    op: &Operation,
    key: &[u8],
) -> Result<TimestampedRecord, StoreError> {
    match op {
        Operation::Get => match engine.get(key)? {
            Some(raw) => TimestampedRecord::decode(&raw),
            None => Ok(TimestampedRecord::absent()),
        },
        Operation::Put(body) => {
            let record = TimestampedRecord::value(body.clone(), now_ms());
            engine.put(key, &record.encode())?;
            Ok(record)
        }
        Operation::Delete => {
            let record = TimestampedRecord::tombstone(now_ms());
            engine.put(key, &record.encode())?;
            Ok(record)
        }
    }
}
