//! # Patricia Trie
//!
//! The main trie data structure with insert and get operations.
//!
//! Every insert writes the changed root-to-leaf path as new nodes and yields a
//! new root digest. Nodes already in storage are never modified, so older roots
//! stay readable through [`PatriciaTrie::for_root`].

use std::sync::Arc;

use alloy_primitives::B256;
use mpt_error::{Error, Result};
use tracing::{debug, trace};

use crate::codec::{Codec, Field, RlpCodec};
use crate::db::{MemoryDB, TrieDB};
use crate::hasher::{Hasher, KeccakHasher, DIGEST_LEN};
use crate::nibbles::Nibbles;
use crate::node::{Node, NodeRef};

/// Empty trie root hash (keccak256(RLP("")))
pub const EMPTY_ROOT: B256 = B256::new([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6,
    0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0,
    0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// Append-only list of encoded nodes visited during a lookup
type ProofSink<'a> = Option<&'a mut Vec<Vec<u8>>>;

/// Storage, codec and hasher a trie works with
#[derive(Debug)]
pub struct TrieConfig<DB, C = RlpCodec, H = KeccakHasher> {
    pub db: Arc<DB>,
    pub codec: C,
    pub hasher: H,
}

impl<DB> TrieConfig<DB> {
    /// RLP + Keccak over the given store
    pub fn with_db(db: Arc<DB>) -> Self {
        TrieConfig {
            db,
            codec: RlpCodec,
            hasher: KeccakHasher,
        }
    }
}

impl Default for TrieConfig<MemoryDB> {
    fn default() -> Self {
        TrieConfig::with_db(Arc::new(MemoryDB::new()))
    }
}

impl<DB, C: Clone, H: Clone> Clone for TrieConfig<DB, C, H> {
    fn clone(&self) -> Self {
        TrieConfig {
            db: Arc::clone(&self.db),
            codec: self.codec.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

/// What a node being split keeps below the new branch
enum Tail {
    /// A leaf's value
    Value(Vec<u8>),
    /// An extension's target
    Child(NodeRef),
}

/// Merkle Patricia Trie
#[derive(Debug)]
pub struct PatriciaTrie<DB: TrieDB = MemoryDB, C: Codec = RlpCodec, H: Hasher = KeccakHasher> {
    /// Root digest
    root: B256,
    /// Digest of the empty node encoding
    empty_root: B256,
    /// Node database
    db: Arc<DB>,
    codec: C,
    hasher: H,
}

impl PatriciaTrie<MemoryDB> {
    /// Create new trie with in-memory database
    pub fn new_memory() -> Self {
        PatriciaTrie::with_config(None, TrieConfig::default())
    }
}

impl<DB: TrieDB> PatriciaTrie<DB> {
    /// Create new empty trie over `db`, using RLP and Keccak
    pub fn new(db: Arc<DB>) -> Self {
        PatriciaTrie::with_config(None, TrieConfig::with_db(db))
    }
}

impl<DB: TrieDB, C: Codec, H: Hasher> PatriciaTrie<DB, C, H> {
    /// Create a trie at `root`, or an empty trie when `root` is `None`
    pub fn with_config(root: Option<B256>, config: TrieConfig<DB, C, H>) -> Self {
        let TrieConfig { db, codec, hasher } = config;
        let empty_root = hasher.hash(&codec.encode(&Field::empty()));
        PatriciaTrie {
            root: root.unwrap_or(empty_root),
            empty_root,
            db,
            codec,
            hasher,
        }
    }

    /// Get root hash
    pub fn root_hash(&self) -> B256 {
        self.root
    }

    /// Root hash of a trie without entries under this codec and hasher
    pub fn empty_root(&self) -> B256 {
        self.empty_root
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.root == self.empty_root
    }

    /// The shared node database
    pub fn db(&self) -> &Arc<DB> {
        &self.db
    }

    /// Get value for key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let nibbles = Nibbles::from_bytes(key);
        let root = self.resolve_hash(&self.root, None)?;
        self.lookup(root, &nibbles, None)
    }

    /// Collect proof nodes along the path for a key
    /// Returns (value, proof_nodes) where proof_nodes are the encodings of
    /// every hash-referenced node visited, root first
    pub fn get_with_proof(&self, key: &[u8]) -> Result<(Option<Vec<u8>>, Vec<Vec<u8>>)> {
        let nibbles = Nibbles::from_bytes(key);
        let mut proof = Vec::new();
        let root = self.resolve_hash(&self.root, Some(&mut proof))?;
        let value = self.lookup(root, &nibbles, Some(&mut proof))?;
        Ok((value, proof))
    }

    /// Proof nodes for a key, proving either its value or its absence
    pub fn get_proof(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.get_with_proof(key).map(|(_, proof)| proof)
    }

    /// Insert key-value pair, returning the new root hash
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<B256> {
        if key.is_empty() {
            return Err(Error::invalid_key("key cannot be empty").with_operation("trie::insert"));
        }

        let nibbles = Nibbles::from_bytes(key);
        let root = self.resolve_hash(&self.root, None)?;
        let new_root = self.insert_node(root, &nibbles, value)?;

        // The root is always stored by hash, however small it is
        let encoded = self.codec.encode(&new_root.to_field());
        self.root = self.write_node(encoded)?;
        debug!(target: "mpt::trie", root = %self.root, key = %hex::encode(key), "Inserted key");

        Ok(self.root)
    }

    /// Internal recursive get
    fn lookup(&self, node: Node, key: &Nibbles, mut proof: ProofSink<'_>) -> Result<Option<Vec<u8>>> {
        match node {
            Node::Empty => Ok(None),

            Node::Leaf { key: leaf_key, value } => Ok((leaf_key == *key).then_some(value)),

            Node::Extension { key: ext_key, child } => {
                if key.common_prefix_len(&ext_key) < ext_key.len() {
                    return Ok(None);
                }

                let child_node = self.resolve_ref(child, reborrow(&mut proof))?;
                self.lookup(child_node, &key.slice(ext_key.len()), proof)
            }

            Node::Branch { mut children, value } => {
                let Some(idx) = key.first() else {
                    return Ok(value);
                };

                let child = std::mem::take(&mut children[idx as usize]);
                if child.is_empty() {
                    return Ok(None);
                }

                let child_node = self.resolve_ref(child, reborrow(&mut proof))?;
                self.lookup(child_node, &key.slice(1), proof)
            }
        }
    }

    /// Internal recursive insert
    ///
    /// Returns the replacement for `node`; the caller decides how to store it.
    fn insert_node(&self, node: Node, key: &Nibbles, value: Vec<u8>) -> Result<Node> {
        match node {
            Node::Empty => Ok(Node::leaf(key.clone(), value)),

            Node::Branch { mut children, value: branch_value } => {
                let Some(idx) = key.first() else {
                    // Path ends here: overwrite the branch value
                    return Ok(Node::Branch {
                        children,
                        value: Some(value),
                    });
                };

                let idx = idx as usize;
                let child = std::mem::take(&mut children[idx]);
                let new_child = if child.is_empty() {
                    Node::leaf(key.slice(1), value)
                } else {
                    let child_node = self.resolve_ref(child, None)?;
                    self.insert_node(child_node, &key.slice(1), value)?
                };
                children[idx] = self.store_node(new_child)?;

                Ok(Node::Branch {
                    children,
                    value: branch_value,
                })
            }

            Node::Leaf { key: leaf_key, value: leaf_value } => {
                let common = leaf_key.common_prefix_len(key);
                if common == leaf_key.len() && common == key.len() {
                    // Same key - update existing leaf
                    return Ok(Node::leaf(leaf_key, value));
                }
                self.split(common, &leaf_key, Tail::Value(leaf_value), key, value)
            }

            Node::Extension { key: ext_key, child } => {
                let common = ext_key.common_prefix_len(key);
                if common == ext_key.len() {
                    // Full match - descend into child
                    let child_node = self.resolve_ref(child, None)?;
                    let new_child = self.insert_node(child_node, &key.slice(common), value)?;
                    return Ok(Node::extension(ext_key, self.store_node(new_child)?));
                }
                self.split(common, &ext_key, Tail::Child(child), key, value)
            }
        }
    }

    /// Replace a leaf or extension whose path diverges from `key` at nibble
    /// `common` with a branch, wrapped in an extension for the shared prefix.
    fn split(
        &self,
        common: usize,
        node_key: &Nibbles,
        tail: Tail,
        key: &Nibbles,
        value: Vec<u8>,
    ) -> Result<Node> {
        let mut children: Box<[NodeRef; 16]> = Box::default();
        let mut branch_value = None;

        // Existing node moves one nibble below the branch
        match (node_key.get(common), tail) {
            (None, Tail::Value(old_value)) => branch_value = Some(old_value),
            (None, Tail::Child(_)) => {
                return Err(Error::unexpected("split requested for a fully matched extension")
                    .with_operation("trie::split"))
            }
            (Some(idx), Tail::Value(old_value)) => {
                let leaf = Node::leaf(node_key.slice(common + 1), old_value);
                children[idx as usize] = self.store_node(leaf)?;
            }
            (Some(idx), Tail::Child(child)) => {
                children[idx as usize] = if node_key.len() == common + 1 {
                    // Extension is fully consumed, its target hangs off the branch
                    child
                } else {
                    self.store_node(Node::extension(node_key.slice(common + 1), child))?
                };
            }
        }

        // New value
        match key.get(common) {
            None => branch_value = Some(value),
            Some(idx) => {
                let leaf = Node::leaf(key.slice(common + 1), value);
                children[idx as usize] = self.store_node(leaf)?;
            }
        }

        let branch = Node::Branch {
            children,
            value: branch_value,
        };

        if common == 0 {
            Ok(branch)
        } else {
            let prefix = key.slice_range(0, common);
            Ok(Node::extension(prefix, self.store_node(branch)?))
        }
    }

    /// Store node in database, return reference
    ///
    /// Nodes whose encoding is shorter than a digest are embedded in the parent.
    fn store_node(&self, node: Node) -> Result<NodeRef> {
        if node.is_empty() {
            return Ok(NodeRef::Empty);
        }

        let encoded = self.codec.encode(&node.to_field());
        if encoded.len() < DIGEST_LEN {
            trace!(target: "mpt::trie", len = encoded.len(), "Embedding node");
            return Ok(NodeRef::Embedded(Box::new(node)));
        }

        Ok(NodeRef::Hash(self.write_node(encoded)?))
    }

    /// Hash an encoded node and write it to the database
    fn write_node(&self, encoded: Vec<u8>) -> Result<B256> {
        let hash = self.hasher.hash(&encoded);
        trace!(target: "mpt::trie", %hash, len = encoded.len(), "Storing node");
        self.db
            .put(hash, encoded)
            .map_err(|err| err.with_operation("trie::store_node"))?;
        Ok(hash)
    }

    /// Resolve a node reference
    fn resolve_ref(&self, node_ref: NodeRef, proof: ProofSink<'_>) -> Result<Node> {
        match node_ref {
            NodeRef::Empty => Ok(Node::Empty),
            NodeRef::Embedded(node) => Ok(*node),
            NodeRef::Hash(hash) => self.resolve_hash(&hash, proof),
        }
    }

    /// Load and decode a hashed node, recording its encoding in `proof`
    fn resolve_hash(&self, hash: &B256, proof: ProofSink<'_>) -> Result<Node> {
        let stored = self
            .db
            .get(hash)
            .map_err(|err| err.with_operation("trie::resolve"))?;

        let data = match stored {
            Some(data) => data,
            // The empty root is never written, its encoding is implied
            None if *hash == self.empty_root => self.codec.encode(&Field::empty()),
            None => return Err(Error::missing_node(hash.to_string()).with_operation("trie::resolve")),
        };

        let node = self
            .codec
            .decode(&data)
            .and_then(Node::from_field)
            .map_err(|err| err.with_context("hash", hash.to_string()))?;

        if let Some(proof) = proof {
            proof.push(data);
        }
        Ok(node)
    }
}

impl<DB: TrieDB, C: Codec + Clone, H: Hasher + Clone> PatriciaTrie<DB, C, H> {
    /// Creates a trie at another root over the same database, codec and hasher
    pub fn for_root(&self, root: B256) -> Self {
        PatriciaTrie {
            root,
            empty_root: self.empty_root,
            db: Arc::clone(&self.db),
            codec: self.codec.clone(),
            hasher: self.hasher.clone(),
        }
    }

    /// The configuration this trie was built with
    pub fn config(&self) -> TrieConfig<DB, C, H> {
        TrieConfig {
            db: Arc::clone(&self.db),
            codec: self.codec.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

fn reborrow<'a>(proof: &'a mut ProofSink<'_>) -> ProofSink<'a> {
    proof.as_mut().map(|p| &mut **p)
}
