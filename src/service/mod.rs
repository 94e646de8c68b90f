//! HTTP Service Module
//!
//! The node's network boundary. Client requests and peer-forwarded requests
//! share the same endpoints:
//!
//! - **`/entity`**: point operations. Client requests are coordinated across
//!   the key's replicas; `proxied=true` requests run on the local replica only.
//! - **`/entities`**: streamed range listing over the local store.
//! - **`/status`**: liveness.
//!
//! Anything else is answered with 400.

pub mod handlers;
pub mod protocol;
pub mod router;

pub use router::{router, serve};

#[cfg(test)]
mod tests;
