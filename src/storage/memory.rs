use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock};

use super::traits::{ScanIter, StorageEngine};
use crate::error::StoreError;

/// Volatile engine over a `BTreeMap`. `Vec<u8>` compares as unsigned bytes.
#[derive(Default)]
pub struct MemoryEngine {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn scan<'a>(&'a self, from: &[u8], to: Option<&[u8]>) -> Result<ScanIter<'a>, StoreError> {
        if let Some(to) = to
            && to <= from
        {
            return Ok(Box::new(std::iter::empty()));
        }

        let upper = match to {
            Some(to) => Bound::Excluded(to.to_vec()),
            None => Bound::Unbounded,
        };

        // Snapshot under the read lock so writers are not blocked by slow consumers.
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .range((Bound::Included(from.to_vec()), upper))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }
}
