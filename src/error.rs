//! Error types for the address-parser core.
//!
//! Reference upstream behavior: `spec.md` §7 (Error Handling Design). Every
//! loader and every public entry point that can fail on malformed input
//! returns one of these variants rather than panicking.

use std::path::PathBuf;

/// The error type returned by fallible operations in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong magic bytes at the head of a model file.
    #[error("invalid signature: expected {expected:#010x}, found {found:#010x}")]
    InvalidSignature { expected: u32, found: u32 },

    /// Signature was fine but the structure beyond it is inconsistent
    /// (truncation, negative lengths, out-of-range indices).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The model directory is missing the required CRF file.
    #[error("missing required model file: {0}")]
    MissingRequiredFile(PathBuf),

    /// The model directory itself does not exist.
    #[error("model directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// A named file inside the model directory does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// A caller-supplied index is out of range for the addressed structure.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// An operation was attempted that the data model forbids (e.g.
    /// inserting an empty key into a trie).
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// Propagated I/O failure while reading a model file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
