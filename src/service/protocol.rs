//! HTTP Protocol
//!
//! Paths, query parameters and the query DTOs shared by the client-facing
//! handlers and the inter-node transport.
//!
//! Clients and peers use the same `/entity` path. A peer request differs only
//! by `proxied=true`, which makes the receiver execute locally and answer with
//! the encoded record instead of the raw value.

use axum::http::Method;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::coordinator::{Operation, ReplicationFactor};
use crate::error::StoreError;

// --- API Endpoints ---

/// Liveness probe. Always 200.
pub const ENDPOINT_STATUS: &str = "/status";
/// Point operations: `GET|PUT|DELETE /entity?id=<key>&replicas=<ack>/<from>`.
pub const ENDPOINT_ENTITY: &str = "/entity";
/// Local range listing: `GET /entities?start=<key>&end=<key>`.
pub const ENDPOINT_ENTITIES: &str = "/entities";

// --- Query parameters ---

pub const PARAM_ID: &str = "id";
pub const PARAM_REPLICAS: &str = "replicas";
/// Marks a request forwarded by a coordinating peer.
pub const PARAM_PROXIED: &str = "proxied";

// --- DTOs ---

/// Body of `/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub node: String,
    pub cluster: Vec<String>,
}

/// Query of `/entity`. Every field is optional at the extractor level so
/// validation order (id first) stays under the handler's control.
#[derive(Debug, Default, Deserialize)]
pub struct EntityParams {
    pub id: Option<String>,
    pub replicas: Option<String>,
    pub proxied: Option<bool>,
}

impl EntityParams {
    /// The key, as raw bytes. Missing or empty is a client error.
    pub fn key(&self) -> Result<Bytes, StoreError> {
        required(self.id.as_deref(), PARAM_ID).map(|id| Bytes::copy_from_slice(id.as_bytes()))
    }

    /// `None` means the cluster default applies.
    pub fn replication(&self) -> Result<Option<ReplicationFactor>, StoreError> {
        self.replicas.as_deref().map(str::parse).transpose()
    }

    pub fn is_proxied(&self) -> bool {
        self.proxied.unwrap_or(false)
    }
}

/// Query of `/entities`.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeParams {
    pub fn start(&self) -> Result<Vec<u8>, StoreError> {
        required(self.start.as_deref(), "start").map(|s| s.as_bytes().to_vec())
    }

    /// An empty `end` means the same as a missing one: no upper bound.
    pub fn end(&self) -> Option<Vec<u8>> {
        self.end
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(|e| e.as_bytes().to_vec())
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, StoreError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(StoreError::bad_request(format!("missing parameter `{}`", name))),
    }
}

/// Maps an HTTP method to the operation it requests. The body is only kept
/// for PUT, where it is the value.
pub fn operation_for(method: &Method, body: Bytes) -> Result<Operation, StoreError> {
    match *method {
        Method::GET => Ok(Operation::Get),
        Method::PUT => Ok(Operation::Put(body)),
        Method::DELETE => Ok(Operation::Delete),
        _ => Err(StoreError::MethodNotAllowed),
    }
}
