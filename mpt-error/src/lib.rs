//! # mpt-error
//!
//! Unified error handling for the trie engine, the proof verifier and the CLI.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., MissingNode, ProofHashMismatch)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Locate the cause (node index, digest, key)
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use mpt_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ProofHashMismatch, "proof node hash mismatch")
//!         .with_operation("proof::verify")
//!         .with_context("node_index", "2"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, mpt_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the trie Error
pub type Result<T> = std::result::Result<T, Error>;
