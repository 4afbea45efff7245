//! # Node Storage
//!
//! Content-addressed storage for hashed nodes. Nodes are written once under
//! their digest and never changed, so any number of tries (current and
//! historical roots) can share one store.

use std::collections::HashMap;

use alloy_primitives::B256;
use mpt_error::Result;
use parking_lot::RwLock;

/// Database interface for storing nodes
///
/// Backends report I/O failures as [`mpt_error::ErrorKind::StorageFailed`]
/// (see `Error::storage_failed`), which is retryable. The trie passes such
/// errors through unchanged apart from adding its operation, so callers decide
/// whether to retry and call `Error::persist` once they give up.
pub trait TrieDB: Send + Sync {
    /// Get node encoding by digest
    fn get(&self, hash: &B256) -> Result<Option<Vec<u8>>>;

    /// Store a node encoding under its digest
    fn put(&self, hash: B256, data: Vec<u8>) -> Result<()>;

    /// Remove node by digest. The trie engine never calls this.
    fn remove(&self, hash: &B256) -> Result<()>;
}

/// In-memory trie database
#[derive(Debug, Default)]
pub struct MemoryDB {
    nodes: RwLock<HashMap<B256, Vec<u8>>>,
}

impl MemoryDB {
    pub fn new() -> Self {
        MemoryDB {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with `(digest, encoding)` pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (B256, Vec<u8>)>) -> Self {
        MemoryDB {
            nodes: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Snapshot of every stored `(digest, encoding)` pair
    pub fn entries(&self) -> Vec<(B256, Vec<u8>)> {
        self.nodes
            .read()
            .iter()
            .map(|(hash, data)| (*hash, data.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl TrieDB for MemoryDB {
    fn get(&self, hash: &B256) -> Result<Option<Vec<u8>>> {
        Ok(self.nodes.read().get(hash).cloned())
    }

    fn put(&self, hash: B256, data: Vec<u8>) -> Result<()> {
        self.nodes.write().insert(hash, data);
        Ok(())
    }

    fn remove(&self, hash: &B256) -> Result<()> {
        self.nodes.write().remove(hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let db = MemoryDB::new();
        let hash = B256::repeat_byte(0x11);

        assert!(db.is_empty());
        assert_eq!(db.get(&hash).unwrap(), None);

        db.put(hash, vec![1, 2, 3]).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.get(&hash).unwrap(), Some(vec![1, 2, 3]));

        db.remove(&hash).unwrap();
        assert_eq!(db.get(&hash).unwrap(), None);
    }

    #[test]
    fn test_entries_roundtrip() {
        let db = MemoryDB::new();
        db.put(B256::repeat_byte(1), vec![1]).unwrap();
        db.put(B256::repeat_byte(2), vec![2]).unwrap();

        let copy = MemoryDB::from_entries(db.entries());
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.get(&B256::repeat_byte(2)).unwrap(), Some(vec![2]));
    }
}
