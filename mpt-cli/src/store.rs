//! State file persistence
//!
//! The CLI keeps one trie per state file: the current root plus every node ever
//! written, hex encoded and keyed by digest. Older roots stay resolvable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::B256;
use mpt_error::{Error, Result};
use mpt_trie::{Hasher, KeccakHasher, MemoryDB, PatriciaTrie};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    root: B256,
    /// hex(digest) -> hex(encoded node)
    nodes: BTreeMap<String, String>,
}

/// A trie stored as a JSON file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the trie, or start an empty one if the file does not exist yet
    pub fn load(&self) -> Result<PatriciaTrie> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No state file, starting empty trie");
            return Ok(PatriciaTrie::new_memory());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::from(e)
                .with_operation("store::load")
                .with_context("path", self.path.display().to_string())
        })?;
        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            Error::parse_failed(format!("invalid state file: {}", e))
                .with_operation("store::load")
                .with_context("path", self.path.display().to_string())
                .set_source(e)
        })?;

        let mut entries = Vec::with_capacity(state.nodes.len());
        for (hash, data) in &state.nodes {
            let hash: B256 = hash.parse().map_err(|_| {
                Error::parse_failed(format!("invalid node digest {}", hash)).with_operation("store::load")
            })?;
            let data = hex::decode(data).map_err(|e| {
                Error::parse_failed(format!("invalid node encoding for {}", hash))
                    .with_operation("store::load")
                    .set_source(e)
            })?;
            if KeccakHasher.hash(&data) != hash {
                return Err(Error::malformed_node(format!("node {} does not match its digest", hash))
                    .with_operation("store::load"));
            }
            entries.push((hash, data));
        }

        debug!(path = %self.path.display(), root = %state.root, nodes = entries.len(), "Loaded state file");
        let db = Arc::new(MemoryDB::from_entries(entries));
        Ok(PatriciaTrie::new(db).for_root(state.root))
    }

    /// Write the trie's root and all of its nodes
    pub fn save(&self, trie: &PatriciaTrie) -> Result<()> {
        let nodes = trie
            .db()
            .entries()
            .into_iter()
            .map(|(hash, data)| (hex::encode(hash), hex::encode(data)))
            .collect();
        let state = StateFile {
            root: trie.root_hash(),
            nodes,
        };

        let content = serde_json::to_string_pretty(&state).map_err(|e| {
            Error::serialization_failed(e.to_string())
                .with_operation("store::save")
                .set_source(e)
        })?;
        std::fs::write(&self.path, content).map_err(|e| {
            Error::from(e)
                .with_operation("store::save")
                .with_context("path", self.path.display().to_string())
        })?;

        debug!(path = %self.path.display(), root = %state.root, "Saved state file");
        Ok(())
    }
}
