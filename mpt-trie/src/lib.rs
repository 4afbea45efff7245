//! # Merkle Patricia Trie
//!
//! Implementation of Ethereum's Modified Merkle Patricia Trie.
//!
//! Key features:
//! - Cryptographic commitment to the entire key/value set in one root digest
//! - Proofs of inclusion/exclusion, verifiable without storage access
//! - Append-only node storage, so every past root stays readable
//!
//! ```rust
//! use mpt_trie::{generate_proof, PatriciaTrie};
//!
//! let mut trie = PatriciaTrie::new_memory();
//! let root = trie.insert(b"dog", b"puppy".to_vec()).unwrap();
//!
//! let proof = generate_proof(&trie, b"dog").unwrap();
//! proof.verify(root).unwrap();
//! ```

pub mod codec;
pub mod db;
pub mod hasher;
pub mod nibbles;
pub mod node;
pub mod proof;
pub mod trie;

pub use codec::{Codec, CodecError, Field, RlpCodec};
pub use db::{MemoryDB, TrieDB};
pub use hasher::{Hasher, KeccakHasher, DIGEST_LEN};
pub use nibbles::Nibbles;
pub use node::{Node, NodeRef};
pub use proof::{generate_proof, verify_proof, ExpectedValue, Proof, ProofVerifier};
pub use trie::{PatriciaTrie, TrieConfig, EMPTY_ROOT};

pub use mpt_error::{Error, ErrorKind, Result};
