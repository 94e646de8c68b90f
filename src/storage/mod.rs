//! Local Storage Module
//!
//! The ordered, byte-keyed store each node owns. The replication layer only
//! ever sees the [`StorageEngine`] trait; which engine backs it is a startup
//! decision.
//!
//! ## Engines
//! - **`MemoryEngine`**: `BTreeMap` behind a lock. Volatile; used by tests and
//!   when no data directory is configured.
//! - **`FjallEngine`**: persistent LSM tree on disk.
//!
//! Both order keys as unsigned bytes, lexicographically, so range scans come out
//! in client-visible key order with no key remapping.

pub mod fjall;
pub mod memory;
pub mod traits;

pub use self::fjall::FjallEngine;
pub use memory::MemoryEngine;
pub use traits::{ScanIter, StorageEngine};
