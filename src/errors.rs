//! Error types for fragsplit.

use thiserror::Error;

/// Result type alias for fragsplit operations
pub type Result<T> = std::result::Result<T, FragError>;

/// Error type for fragsplit operations
#[derive(Error, Debug)]
pub enum FragError {
    /// A `--size` value that is not `<int>-<int>`
    #[error("Malformed size range '{0}': expected <min>-<max>, e.g. 100-200")]
    MalformedRange(String),

    /// A size range whose lower bound exceeds its upper bound
    #[error("Invalid size range {min}-{max}: min must not be greater than max")]
    InvertedRange {
        /// Lower bound as given
        min: i64,
        /// Upper bound as given
        max: i64,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Failure opening an alignment file
    #[error("Unable to open '{path}': {source}")]
    Open {
        /// Path that failed to open
        path: String,
        /// Underlying htslib error
        source: rust_htslib::errors::Error,
    },

    /// Failure reading or writing alignment records mid-scan
    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),

    /// Failure writing a text table
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
