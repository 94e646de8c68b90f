use std::path::Path;

use super::traits::{ScanIter, StorageEngine};
use crate::error::StoreError;

const RECORDS_KEYSPACE: &str = "records";

fn fjall_err(e: fjall::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

/// Persistent engine backed by a single fjall keyspace.
///
/// fjall orders keys as unsigned bytes, which is already the client-visible
/// key order.
pub struct FjallEngine {
    _db: fjall::Database,
    records: fjall::Keyspace,
}

impl FjallEngine {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = fjall::Database::builder(path).open().map_err(fjall_err)?;
        let records = db
            .keyspace(RECORDS_KEYSPACE, fjall::KeyspaceCreateOptions::default)
            .map_err(fjall_err)?;
        tracing::info!(path = %path.display(), "opened fjall storage");
        Ok(Self { _db: db, records })
    }
}

impl StorageEngine for FjallEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .records
            .get(key)
            .map_err(fjall_err)?
            .map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.records
            .insert(key.to_vec(), value.to_vec())
            .map_err(fjall_err)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.records.remove(key.to_vec()).map_err(fjall_err)
    }

    fn scan<'a>(&'a self, from: &[u8], to: Option<&[u8]>) -> Result<ScanIter<'a>, StoreError> {
        let start = from.to_vec();
        match to {
            Some(to) if to <= from => Ok(Box::new(std::iter::empty())),
            Some(to) => Ok(Box::new(self.records.range(start..to.to_vec()).map(|g| {
                g.into_inner()
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(fjall_err)
            }))),
            None => Ok(Box::new(self.records.range(start..).map(|g| {
                g.into_inner()
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(fjall_err)
            }))),
        }
    }
}
