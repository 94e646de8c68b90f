//! Error taxonomy shared by the storage, coordination and HTTP layers.
//!
//! Storage and transport faults are never surfaced to clients directly: the
//! coordinator downgrades them to a missed sub-operation. They only reach the
//! boundary when a single-node path executes locally.

use axum::http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Missing/empty `id`, malformed `replicas`, or an out-of-range quorum.
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Fewer than `ack` replicas answered inside the fan-out window.
    #[error("not enough replicas: need {needed}, got {got}")]
    InsufficientReplicas { needed: usize, got: usize },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed record: {0}")]
    Codec(String),
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

impl StoreError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            StoreError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            StoreError::InsufficientReplicas { .. } => StatusCode::GATEWAY_TIMEOUT,
            StoreError::Storage(_)
            | StoreError::Transport(_)
            | StoreError::Codec(_)
            | StoreError::InvalidTopology(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}
