//! # Merkle Proofs
//!
//! Generate and verify proofs of inclusion/exclusion for keys in the trie.
//!
//! A proof is the ordered list of encoded nodes met on the way from the root
//! to the key. Verification needs no storage: each entry must hash to the
//! digest its parent points at, and the key's nibbles are replayed through the
//! decoded nodes until a value (or proof of its absence) is reached.

use std::fmt;

use alloy_primitives::{Bytes, B256};
use mpt_error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::{Codec, Field, RlpCodec};
use crate::db::TrieDB;
use crate::hasher::{Hasher, KeccakHasher};
use crate::nibbles::Nibbles;
use crate::node::{Node, NodeRef, BRANCH_FIELDS};
use crate::trie::PatriciaTrie;

/// What the caller claims about the proven key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedValue<'a> {
    /// The key must not exist
    Absent,
    /// Accept whatever the proof leads to, including no value
    Any,
    /// The key must map to exactly these bytes
    Value(&'a [u8]),
}

impl ExpectedValue<'_> {
    fn allows_absence(&self) -> bool {
        !matches!(self, ExpectedValue::Value(_))
    }
}

impl<'a> From<Option<&'a [u8]>> for ExpectedValue<'a> {
    fn from(value: Option<&'a [u8]>) -> Self {
        value.map_or(ExpectedValue::Absent, ExpectedValue::Value)
    }
}

/// Outcome of replaying one proof entry
enum Step {
    /// Continue with the entry hashing to this digest
    Next(B256),
    /// Replay finished with this value
    Done(Option<Vec<u8>>),
}

/// Stateless proof verifier
///
/// Holds the codec and hasher the proven trie was built with, plus an optional
/// prefix put in front of rejection messages.
#[derive(Debug, Clone, Default)]
pub struct ProofVerifier<C = RlpCodec, H = KeccakHasher> {
    codec: C,
    hasher: H,
    error_prefix: Option<String>,
}

impl<C: Codec, H: Hasher> ProofVerifier<C, H> {
    pub fn new(codec: C, hasher: H) -> Self {
        ProofVerifier {
            codec,
            hasher,
            error_prefix: None,
        }
    }

    /// Prefix every rejection message with `prefix`
    pub fn with_error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_prefix = Some(prefix.into());
        self
    }

    /// Verify `proof` for `key` against `root`.
    ///
    /// Returns the proven value: `None` for a successful exclusion proof, or
    /// for [`ExpectedValue::Any`] when the key is absent.
    pub fn verify<P: AsRef<[u8]>>(
        &self,
        root: B256,
        key: &[u8],
        proof: &[P],
        expected: ExpectedValue<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let mut path = Nibbles::from_bytes(key);
        let mut wanted = root;
        let mut outcome = None;

        for (index, entry) in proof.iter().enumerate() {
            let entry = entry.as_ref();
            if self.hasher.hash(entry) != wanted {
                return Err(self.reject(
                    ErrorKind::ProofHashMismatch,
                    index,
                    format!("bad proof node {}: hash mismatch", index),
                ));
            }

            let node = self.decode_entry(entry, &path, index)?;
            trace!(target: "mpt::proof", index, remaining = %path, "Checking proof node");

            let is_last = index + 1 == proof.len();
            match self.check_node(node, &mut path, &expected, index, is_last)? {
                Step::Next(hash) => wanted = hash,
                Step::Done(value) => outcome = Some(value),
            }
        }

        let last = proof.len().saturating_sub(1);
        let Some(value) = outcome else {
            return Err(self.reject(ErrorKind::IncompleteProof, last, "unexpected end of proof"));
        };

        match expected {
            ExpectedValue::Absent => match value {
                Some(found) => Err(self.reject(
                    ErrorKind::UnexpectedExistence,
                    last,
                    format!("the value shouldn't exist, but is {}", hex::encode(found)),
                )),
                None => Ok(None),
            },
            ExpectedValue::Any => Ok(value),
            ExpectedValue::Value(want) if value.as_deref() == Some(want) => Ok(value),
            ExpectedValue::Value(want) => Err(self.reject(
                ErrorKind::UnexpectedValue,
                last,
                format!(
                    "the proven value was expected to be {} but is {}",
                    hex::encode(want),
                    value.map_or_else(|| "absent".to_string(), hex::encode)
                ),
            )),
        }
    }

    fn decode_entry(&self, entry: &[u8], path: &Nibbles, index: usize) -> Result<Node> {
        let with_index = |err: Error| err.with_context("node_index", index.to_string());
        let field = self.codec.decode(entry).map_err(with_index)?;

        // A top-level branch ending the path must carry a plain value. Branches
        // embedded in the entry are decoded with it, so a nested value there
        // surfaces as MalformedNode from Node::from_field instead.
        if let Field::List(items) = &field {
            if path.is_empty() && items.len() == BRANCH_FIELDS {
                if let Some(Field::List(_)) = items.last() {
                    return Err(self.reject(
                        ErrorKind::TrailingProofNodes,
                        index,
                        "branch value at end of proof is a nested list",
                    ));
                }
            }
        }

        Node::from_field(field).map_err(with_index)
    }

    /// Apply one node to the remaining path. Embedded children are checked
    /// in place, as part of the same proof entry.
    fn check_node(
        &self,
        node: Node,
        path: &mut Nibbles,
        expected: &ExpectedValue<'_>,
        index: usize,
        is_last: bool,
    ) -> Result<Step> {
        match node {
            Node::Empty => {
                if is_last && expected.allows_absence() {
                    return Ok(Step::Done(None));
                }
                Err(self.reject(ErrorKind::InvalidEmptyNode, index, "invalid empty node here"))
            }

            Node::Branch { mut children, value } => {
                let Some(idx) = path.first() else {
                    if !is_last {
                        return Err(self.reject(
                            ErrorKind::TrailingProofNodes,
                            index,
                            "additional nodes at end of proof (branch)",
                        ));
                    }
                    return Ok(Step::Done(value));
                };

                *path = path.slice(1);
                match std::mem::take(&mut children[idx as usize]) {
                    NodeRef::Empty if is_last => Ok(Step::Done(None)),
                    NodeRef::Empty => Err(self.reject(
                        ErrorKind::TrailingProofNodes,
                        index,
                        "additional nodes after empty branch slot",
                    )),
                    NodeRef::Hash(hash) => Ok(Step::Next(hash)),
                    NodeRef::Embedded(child) => self.check_node(*child, path, expected, index, is_last),
                }
            }

            Node::Leaf { key, value } => {
                if key.common_prefix_len(path) < key.len() {
                    return self.diverged(expected, index, is_last, "leaf");
                }
                *path = path.slice(key.len());

                if !path.is_empty() {
                    // Key continues past the leaf
                    return self.diverged(expected, index, is_last, "leaf");
                }
                if !is_last {
                    return Err(self.reject(
                        ErrorKind::TrailingProofNodes,
                        index,
                        "additional nodes at end of proof (leaf)",
                    ));
                }
                if *expected == ExpectedValue::Absent {
                    return Err(self.reject(
                        ErrorKind::UnexpectedExistence,
                        index,
                        format!("the value shouldn't exist, but is {}", hex::encode(&value)),
                    ));
                }
                Ok(Step::Done(Some(value)))
            }

            Node::Extension { key, child } => {
                if key.common_prefix_len(path) < key.len() {
                    return self.diverged(expected, index, is_last, "extension");
                }
                *path = path.slice(key.len());

                // An exhausted path still continues into the target
                match child {
                    NodeRef::Hash(hash) => Ok(Step::Next(hash)),
                    NodeRef::Embedded(target) => self.check_node(*target, path, expected, index, is_last),
                    // Node::from_field already rejects extensions without a target
                    NodeRef::Empty => Err(Error::malformed_node("extension without target")
                        .with_context("node_index", index.to_string())),
                }
            }
        }
    }

    /// The proven path leaves the key: valid only as the final entry of an
    /// exclusion proof
    fn diverged(
        &self,
        expected: &ExpectedValue<'_>,
        index: usize,
        is_last: bool,
        node_type: &str,
    ) -> Result<Step> {
        if is_last && expected.allows_absence() {
            return Ok(Step::Done(None));
        }
        Err(self.reject(
            ErrorKind::PathMismatch,
            index,
            format!("key does not match with the proof one ({})", node_type),
        ))
    }

    fn reject(&self, kind: ErrorKind, index: usize, message: impl fmt::Display) -> Error {
        let message = match &self.error_prefix {
            Some(prefix) => format!("{}: {}", prefix, message),
            None => message.to_string(),
        };
        debug!(target: "mpt::proof", %kind, node_index = index, %message, "Proof rejected");
        Error::proof_rejected(kind, index, message)
    }
}

/// Verify a proof built with RLP and Keccak
pub fn verify_proof<P: AsRef<[u8]>>(
    root: B256,
    key: &[u8],
    proof: &[P],
    expected: ExpectedValue<'_>,
) -> Result<Option<Vec<u8>>> {
    ProofVerifier::<RlpCodec, KeccakHasher>::default().verify(root, key, proof, expected)
}

/// A Merkle proof for a key in the trie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The key being proven
    pub key: Bytes,
    /// The value (None if proving non-existence)
    pub value: Option<Bytes>,
    /// Proof nodes, root first
    pub nodes: Vec<Bytes>,
}

impl Proof {
    /// Create new proof
    pub fn new(key: Vec<u8>, value: Option<Vec<u8>>, nodes: Vec<Vec<u8>>) -> Self {
        Proof {
            key: key.into(),
            value: value.map(Bytes::from),
            nodes: nodes.into_iter().map(Bytes::from).collect(),
        }
    }

    /// Verify proof against a root hash
    ///
    /// Checks inclusion of `value` when it is set, exclusion of `key` otherwise.
    pub fn verify(&self, root: B256) -> Result<()> {
        self.verify_with(&ProofVerifier::<RlpCodec, KeccakHasher>::default(), root)
    }

    /// Verify with a custom codec and hasher
    pub fn verify_with<C: Codec, H: Hasher>(&self, verifier: &ProofVerifier<C, H>, root: B256) -> Result<()> {
        let expected = ExpectedValue::from(self.value.as_ref().map(|value| &value[..]));
        verifier.verify(root, &self.key, &self.nodes, expected)?;
        Ok(())
    }
}

/// Generate proof for a key
/// Collects all hashed nodes along the path from root to the key
pub fn generate_proof<DB: TrieDB, C: Codec, H: Hasher>(
    trie: &PatriciaTrie<DB, C, H>,
    key: &[u8],
) -> Result<Proof> {
    let (value, nodes) = trie.get_with_proof(key)?;
    Ok(Proof::new(key.to_vec(), value, nodes))
}
