//! Error types for record addressing and reconciliation primitives.
//!
//! Reads into the record tree are lenient and never error (extraction
//! legitimately produces partial records); writes are strict and fail with a
//! descriptive [`CoreError`].

use thiserror::Error;

/// Errors raised by the strict write path of pointer addressing.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A pointer must address at least one segment when writing.
    #[error("json pointer cannot be empty when setting")]
    EmptyPointer,

    /// A sequence was indexed with a non-numeric segment.
    #[error("json pointer list index is not an integer: {token}")]
    IndexNotNumeric {
        /// The offending pointer segment.
        token: String,
    },

    /// A sequence index was outside the sequence bounds.
    #[error("json pointer list index out of range: {index} (len {len})")]
    IndexOutOfRange {
        /// The parsed index.
        index: usize,
        /// Length of the addressed sequence.
        len: usize,
    },

    /// Traversal reached a scalar where a container was required.
    #[error("json pointer target is not a container at segment '{segment}'")]
    NotAContainer {
        /// The segment at which traversal stopped.
        segment: String,
    },
}

/// Type alias for [`Result<T, CoreError>`].
pub type Result<T> = std::result::Result<T, CoreError>;
