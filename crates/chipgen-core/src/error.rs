//! Error types for configuration, resolution, and derivation.

/// Errors that can occur while loading configuration or building the chip table.
#[derive(Debug, thiserror::Error)]
pub enum ChipError {
    /// The configuration document is malformed or structurally invalid.
    #[error("invalid configuration in {origin}: {detail}")]
    Config {
        /// Where the configuration came from (file path or `<string>`).
        origin: String,
        /// Description of the problem.
        detail: String,
    },

    /// The device database could not resolve a field for a chip.
    #[error("failed to resolve `{field}` for chip `{chip}`: {diagnostic}")]
    Resolution {
        /// The chip identifier that was queried.
        chip: String,
        /// The database field name that was queried.
        field: String,
        /// Diagnostic output from the database tool.
        diagnostic: String,
    },

    /// A derived field could not be computed from a resolved value.
    #[error(
        "cannot derive target tag for chip `{chip}`: family `{family}` has no 2-character window at offset 5"
    )]
    Derivation {
        /// The chip identifier whose record was being assembled.
        chip: String,
        /// The resolved family value.
        family: String,
    },

    /// The worker pool for concurrent resolution could not be started.
    #[error("failed to start resolver worker pool: {detail}")]
    WorkerPool {
        /// Description of the failure.
        detail: String,
    },

    /// I/O error reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChipError {
    pub(crate) fn config(origin: impl Into<String>, detail: impl Into<String>) -> Self {
        ChipError::Config {
            origin: origin.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for chipgen core operations.
pub type Result<T> = std::result::Result<T, ChipError>;
