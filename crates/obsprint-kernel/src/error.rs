//! Error types for the print procedure.
//!
//! Only conditions that abort the whole procedure live here. Per-field,
//! per-channel and per-level misses are recoverable and are reported as
//! [`SkipNotice`](crate::gather::SkipNotice) values instead.

use crate::distribution::CollectiveError;
use crate::field::ElementType;

/// Errors that abort a print run on every worker.
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    /// The minimum row bound exceeds the maximum row bound.
    #[error("minimum row {min} cannot be larger than maximum row {max}")]
    InvalidRange { min: usize, max: usize },

    /// An element type name that the dispatch does not know.
    #[error("invalid variable type for printing: {0}")]
    UnsupportedElementType(String),

    /// Malformed print parameters.
    #[error("invalid print parameters: {0}")]
    InvalidParameters(String),

    /// Print parameters that do not parse.
    #[error("failed to parse print parameters: {0}")]
    Toml(#[from] toml::de::Error),

    /// Workers disagree on the element type of a field.
    #[error("workers disagree on the type of {field}: {first} vs {other}")]
    InconsistentSchema {
        field: String,
        first: ElementType,
        other: ElementType,
    },

    /// Two partial columns of different element types were merged.
    #[error("cannot merge {actual} column into {expected} column")]
    ColumnTypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    /// The collective primitive failed.
    #[error(transparent)]
    Collective(#[from] CollectiveError),

    /// Writing to the output sink failed.
    #[error("output sink error: {0}")]
    Io(#[from] std::io::Error),
}
