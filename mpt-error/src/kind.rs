//! Error kinds for trie operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to tell a corrupt store apart from a rejected
/// proof or a bad argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Trie engine errors
    // =========================================================================
    /// Key is empty
    InvalidKey,

    /// A hash reference could not be resolved in storage
    MissingNode,

    /// A node's field list has an impossible shape or encoding
    MalformedNode,

    // =========================================================================
    // Proof verification rejections
    // =========================================================================
    /// A proof entry does not hash to the digest its parent referenced
    ProofHashMismatch,

    /// An empty node appeared where it cannot prove anything
    InvalidEmptyNode,

    /// A leaf or extension path diverges from the proven key
    PathMismatch,

    /// The proof terminated but more entries follow
    TrailingProofNodes,

    /// A value exists where non-existence was claimed
    UnexpectedExistence,

    /// The proven value differs from the expected one
    UnexpectedValue,

    /// The proof ran out before reaching a terminal node
    IncompleteProof,

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Storage operation failed
    StorageFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Trie
            ErrorKind::InvalidKey => "InvalidKey",
            ErrorKind::MissingNode => "MissingNode",
            ErrorKind::MalformedNode => "MalformedNode",

            // Proof
            ErrorKind::ProofHashMismatch => "ProofHashMismatch",
            ErrorKind::InvalidEmptyNode => "InvalidEmptyNode",
            ErrorKind::PathMismatch => "PathMismatch",
            ErrorKind::TrailingProofNodes => "TrailingProofNodes",
            ErrorKind::UnexpectedExistence => "UnexpectedExistence",
            ErrorKind::UnexpectedValue => "UnexpectedValue",
            ErrorKind::IncompleteProof => "IncompleteProof",

            // Storage
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::StorageFailed | ErrorKind::IoFailed)
    }

    /// Check if this kind is a rejection of an untrusted proof
    pub fn is_proof_rejection(&self) -> bool {
        matches!(
            self,
            ErrorKind::ProofHashMismatch
                | ErrorKind::InvalidEmptyNode
                | ErrorKind::PathMismatch
                | ErrorKind::TrailingProofNodes
                | ErrorKind::UnexpectedExistence
                | ErrorKind::UnexpectedValue
                | ErrorKind::IncompleteProof
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MissingNode.to_string(), "MissingNode");
        assert_eq!(ErrorKind::ProofHashMismatch.to_string(), "ProofHashMismatch");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::StorageFailed.is_retryable());
        assert!(!ErrorKind::MissingNode.is_retryable());
        assert!(!ErrorKind::UnexpectedValue.is_retryable());
    }

    #[test]
    fn test_is_proof_rejection() {
        assert!(ErrorKind::PathMismatch.is_proof_rejection());
        assert!(ErrorKind::IncompleteProof.is_proof_rejection());
        assert!(!ErrorKind::MalformedNode.is_proof_rejection());
        assert!(!ErrorKind::InvalidKey.is_proof_rejection());
    }
}
