//! # Node Hasher
//!
//! Digest function used to address stored nodes and to check proofs.

use alloy_primitives::{keccak256, B256};

/// Size of every node digest in bytes.
///
/// Node encodings shorter than this are embedded in their parent instead of
/// being stored under a digest.
pub const DIGEST_LEN: usize = 32;

/// Deterministic, collision-resistant digest of node encodings
pub trait Hasher: Send + Sync {
    /// Hash the given bytes
    fn hash(&self, data: &[u8]) -> B256;
}

/// Keccak-256, as used by Ethereum tries
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakHasher;

impl Hasher for KeccakHasher {
    fn hash(&self, data: &[u8]) -> B256 {
        keccak256(data)
    }
}
