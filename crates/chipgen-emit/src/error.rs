//! Emission errors.

use std::path::PathBuf;

/// Errors that can occur while rendering or writing the generated document.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// A value cannot be placed in a string literal without escaping.
    #[error("chip `{chip}` field `{field}` contains {found:?}, which is not allowed in a string literal")]
    UnsafeLiteral {
        /// Chip whose value was rejected.
        chip: String,
        /// Field name in the generated struct.
        field: String,
        /// First offending character.
        found: char,
    },

    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for emission operations.
pub type Result<T> = std::result::Result<T, EmitError>;
