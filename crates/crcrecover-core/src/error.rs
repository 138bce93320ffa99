//! Error types for the crcrecover-core library.
//!
//! Everything fallible in the library reports through [`Error`]. Search
//! termination (early stop or cancellation) is not an error and is reported
//! through [`SearchStatus`](crate::SearchStatus) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crcrecover operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all crcrecover operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// `|charset|^length` does not fit the candidate index type
    #[error("search space too large to address: {charset_len}^{length} candidates")]
    SearchSpaceTooLarge {
        /// Number of distinct characters in the charset
        charset_len: usize,
        /// Requested candidate length
        length: u64,
    },

    /// Invalid search or scheduler configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to open or read an archive
    #[error("failed to open archive '{path}': {source}")]
    ArchiveOpen {
        /// Path to the archive
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Archive structure is corrupt or unsupported
    #[error("invalid archive format at offset {offset}: {details}")]
    ArchiveFormat {
        /// Byte offset where the problem was detected
        offset: u64,
        /// Detailed description of the issue
        details: String,
    },

    /// Malformed selection input
    #[error("invalid selection '{token}': {details}")]
    InputParse {
        /// The offending token
        token: String,
        /// Detailed description of the issue
        details: String,
    },

    /// A match sink failed to accept a match
    #[error("failed to report match: {0}")]
    Report(#[source] std::io::Error),
}

impl Error {
    /// Creates a new search space overflow error
    pub fn search_space_too_large(charset_len: usize, length: u64) -> Self {
        Self::SearchSpaceTooLarge {
            charset_len,
            length,
        }
    }

    /// Creates a new configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new archive open error
    pub fn archive_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ArchiveOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a new archive format error
    pub fn archive_format(offset: u64, details: impl Into<String>) -> Self {
        Self::ArchiveFormat {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new selection parse error
    pub fn input_parse(token: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InputParse {
            token: token.into(),
            details: details.into(),
        }
    }

    /// Returns true if this error was raised while validating a search before it started
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::SearchSpaceTooLarge { .. } | Self::InvalidConfiguration(_)
        )
    }
}
