use axum::extract::{DefaultBodyLimit, Extension};
use axum::{Router, routing::any};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_entities, handle_entity, handle_status, handle_unknown};
use super::protocol::{ENDPOINT_ENTITIES, ENDPOINT_ENTITY, ENDPOINT_STATUS};
use crate::coordinator::{PeerTransport, ReplicaCoordinator};

/// Builds the node's HTTP surface.
///
/// Routes accept any method; the handlers answer 405 themselves so that a
/// missing `id` is reported before an unsupported method.
///
/// `max_value_bytes` caps request bodies (413 above it). `None` accepts values
/// of any size, replacing axum's built-in 2 MiB default.
pub fn router<T: PeerTransport>(
    coordinator: Arc<ReplicaCoordinator<T>>,
    max_value_bytes: Option<usize>,
) -> Router {
    Router::new()
        .route(ENDPOINT_STATUS, any(handle_status::<T>))
        .route(ENDPOINT_ENTITY, any(handle_entity::<T>))
        .route(ENDPOINT_ENTITIES, any(handle_entities::<T>))
        .fallback(handle_unknown)
        .layer(body_limit(max_value_bytes))
        .layer(Extension(coordinator))
        .layer(TraceLayer::new_for_http())
}

fn body_limit(max_value_bytes: Option<usize>) -> DefaultBodyLimit {
    match max_value_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    }
}

/// Serves until `shutdown` resolves. In-flight requests are allowed to finish.
pub async fn serve<T, F>(
    listener: TcpListener,
    coordinator: Arc<ReplicaCoordinator<T>>,
    max_value_bytes: Option<usize>,
    shutdown: F,
) -> std::io::Result<()>
where
    T: PeerTransport,
    F: Future<Output = ()> + Send + 'static,
{
    let local = coordinator.topology().local_node().clone();
    tracing::info!(
        node = %local,
        addr = ?listener.local_addr().ok(),
        cluster_size = coordinator.topology().len(),
        max_value_bytes,
        "HTTP server listening"
    );

    axum::serve(listener, router(coordinator, max_value_bytes))
        .with_graceful_shutdown(shutdown)
        .await
}
