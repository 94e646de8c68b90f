//! Inter-node transport.
//!
//! A peer executes a forwarded operation as a *proxied* request: it applies the
//! operation to its own storage only and answers with the encoded
//! [`TimestampedRecord`], so the coordinator can compare timestamps.

use bytes::Bytes;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

use super::types::Operation;
use crate::error::StoreError;
use crate::record::TimestampedRecord;
use crate::service::protocol::{ENDPOINT_ENTITY, PARAM_ID, PARAM_PROXIED};
use crate::topology::NodeId;

/// Sends one sub-operation to a peer replica.
///
/// Uses RPITIT so implementations stay plain `async fn`s without boxing.
pub trait PeerTransport: Send + Sync + 'static {
    /// Any error means the peer does not count toward quorum for this request.
    fn forward(
        &self,
        node: &NodeId,
        op: &Operation,
        key: &Bytes,
    ) -> impl Future<Output = Result<TimestampedRecord, StoreError>> + Send;
}

/// HTTP transport. reqwest keeps a connection pool per destination host,
/// shared by all concurrent requests.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
}

impl HttpPeerClient {
    /// `timeout` bounds every proxied call, connect included.
    pub fn new(timeout: Duration) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { http_client })
    }
}

impl PeerTransport for HttpPeerClient {
    async fn forward(
        &self,
        node: &NodeId,
        op: &Operation,
        key: &Bytes,
    ) -> Result<TimestampedRecord, StoreError> {
        let id = std::str::from_utf8(key)
            .map_err(|_| StoreError::Transport("key is not valid UTF-8".into()))?;
        let url = format!("{}{}", node, ENDPOINT_ENTITY);

        let request = match op {
            Operation::Get => self.http_client.get(&url),
            Operation::Put(body) => self.http_client.put(&url).body(body.clone()),
            Operation::Delete => self.http_client.delete(&url),
        };

        let response = request
            .query(&[(PARAM_ID, id), (PARAM_PROXIED, "true")])
            .send()
            .await?;

        let status = response.status();
        if !is_replica_reply(status) {
            return Err(StoreError::Transport(format!(
                "{} answered {} to proxied {}",
                node,
                status,
                op.name()
            )));
        }

        let body = response.bytes().await?;
        TimestampedRecord::decode(&body)
    }
}

/// Statuses a proxied call answers with when the replica did its job.
/// 404 is included: a confirmed absence is a result.
pub fn is_replica_reply(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NOT_FOUND
    )
}
