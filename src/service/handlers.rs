use axum::{
    Json,
    body::Body,
    extract::{Extension, Query},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::protocol::{EntityParams, RangeParams, StatusResponse, operation_for};
use crate::coordinator::{Operation, Outcome, PeerTransport, ReplicaCoordinator};
use crate::error::StoreError;
use crate::record::TimestampedRecord;
use crate::storage::StorageEngine;

/// Entries buffered between the scanning thread and the response body.
const SCAN_CHANNEL_CAPACITY: usize = 64;

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Value(value) => (StatusCode::OK, value).into_response(),
            Outcome::NotFound => StatusCode::NOT_FOUND.into_response(),
            Outcome::Created => StatusCode::CREATED.into_response(),
            Outcome::Accepted => StatusCode::ACCEPTED.into_response(),
        }
    }
}

/// `GET|PUT|DELETE /entity`.
///
/// Validation runs in a fixed order: `id`, then method, then `replicas`.
/// A proxied request is executed locally and answered with the encoded record.
pub async fn handle_entity<T: PeerTransport>(
    Extension(coordinator): Extension<Arc<ReplicaCoordinator<T>>>,
    method: Method,
    Query(params): Query<EntityParams>,
    body: Bytes,
) -> Response {
    let key = match params.key() {
        Ok(key) => key,
        Err(e) => return e.into_response(),
    };
    let op = match operation_for(&method, body) {
        Ok(op) => op,
        Err(e) => return e.into_response(),
    };

    if params.is_proxied() {
        return match coordinator.serve_proxied(op.clone(), key).await {
            Ok(record) => (proxied_status(&op, &record), record.encode()).into_response(),
            Err(e) => {
                tracing::error!(op = op.name(), error = %e, "proxied operation failed");
                e.into_response()
            }
        };
    }

    let replicas = match params.replication() {
        Ok(replicas) => replicas,
        Err(e) => return e.into_response(),
    };

    match coordinator.execute(op, key, replicas).await {
        Ok(outcome) => outcome.into_response(),
        Err(e) => {
            if matches!(e, StoreError::InsufficientReplicas { .. }) {
                tracing::warn!(error = %e, "request failed");
            }
            e.into_response()
        }
    }
}

/// Same codes a client would see, so the peer's status stays meaningful in
/// logs; the coordinator reads the timestamped body.
fn proxied_status(op: &Operation, record: &TimestampedRecord) -> StatusCode {
    match op {
        Operation::Get if record.is_tombstone() => StatusCode::NOT_FOUND,
        Operation::Get => StatusCode::OK,
        Operation::Put(_) => StatusCode::CREATED,
        Operation::Delete => StatusCode::ACCEPTED,
    }
}

/// `GET /entities?start=<key>&end=<key>`.
///
/// Streams this node's records in `[start, end)` as `key\nvalue\n` entries.
/// Not replica-aware: no fan-out, no resolution. Tombstones are dropped here
/// and records that fail to decode are skipped.
pub async fn handle_entities<T: PeerTransport>(
    Extension(coordinator): Extension<Arc<ReplicaCoordinator<T>>>,
    method: Method,
    Query(params): Query<RangeParams>,
) -> Response {
    let start = match params.start() {
        Ok(start) => start,
        Err(e) => return e.into_response(),
    };
    if method != Method::GET {
        return StoreError::MethodNotAllowed.into_response();
    }
    let end = params.end();

    let engine = coordinator.local().engine().clone();
    let (tx, rx) = mpsc::channel::<Result<Bytes, StoreError>>(SCAN_CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        stream_range(engine.as_ref(), &start, end.as_deref(), tx)
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (StatusCode::OK, Body::from_stream(stream)).into_response()
}

/// Runs on the blocking pool. Stops early when the client goes away.
fn stream_range(
    engine: &dyn StorageEngine,
    start: &[u8],
    end: Option<&[u8]>,
    tx: mpsc::Sender<Result<Bytes, StoreError>>,
) {
    let entries = match engine.scan(start, end) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "range scan failed");
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };

    let mut sent = 0usize;
    for entry in entries {
        let (key, raw) = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(error = %e, sent, "range scan aborted");
                let _ = tx.blocking_send(Err(e));
                return;
            }
        };

        let record = match TimestampedRecord::decode(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "skipping undecodable record"
                );
                continue;
            }
        };
        let Some(value) = record.payload() else {
            continue;
        };

        let mut chunk = BytesMut::with_capacity(key.len() + value.len() + 2);
        chunk.put_slice(&key);
        chunk.put_u8(b'\n');
        chunk.put_slice(value);
        chunk.put_u8(b'\n');

        if tx.blocking_send(Ok(chunk.freeze())).is_err() {
            tracing::debug!(sent, "client went away during range listing");
            return;
        }
        sent += 1;
    }

    tracing::debug!(sent, "range listing complete");
}

/// `/status`: the node is up if it can answer.
pub async fn handle_status<T: PeerTransport>(
    Extension(coordinator): Extension<Arc<ReplicaCoordinator<T>>>,
) -> Json<StatusResponse> {
    let topology = coordinator.topology();
    Json(StatusResponse {
        node: topology.local_node().to_string(),
        cluster: topology.all_nodes().iter().map(|n| n.to_string()).collect(),
    })
}

/// Any unknown path.
pub async fn handle_unknown() -> StatusCode {
    StatusCode::BAD_REQUEST
}
