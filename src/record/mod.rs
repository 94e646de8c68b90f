//! Timestamped Record Module
//!
//! Every value stored on the replicated path is wrapped in a [`TimestampedRecord`]:
//! the payload plus the wall-clock millisecond at which the owning node performed
//! the mutation. Deletes are writes of a tombstone record, never physical removal,
//! so a delete can out-race (or lose to) a concurrent write during resolution.
//!
//! ## Submodules
//! - **`types`**: The record itself, its derived kind, and newest-wins resolution.
//! - **`codec`**: The fixed binary layout records are persisted and exchanged in.

pub mod codec;
pub mod types;

pub use types::{RecordKind, TimestampedRecord, latest_of, now_ms};
