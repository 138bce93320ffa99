//! # crcrecover-core
//!
//! A library for recovering short strings from their CRC32 checksum and length.
//!
//! ZIP archives record each member's uncompressed size and CRC32 in the
//! central directory, readable without the password or any decompression.
//! For small members that is enough to enumerate every string of that length
//! over a charset and keep the ones whose checksum matches.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`checksum`]: The [`Checksum`] trait and the CRC32 implementation
//! - [`charset`]: Ordered character sets
//! - [`generator`]: Index-addressable candidate enumeration
//! - [`search`]: The parallel searcher and its configuration
//! - [`report`]: Match types and sinks
//! - [`archive`]: ZIP central-directory listing
//! - [`selection`]: Parsing of `"0-3,5"` style entry selections
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use crcrecover_core::{search, Charset, SearchPolicy, SearchSpec, SearchStatus};
//!
//! let spec = SearchSpec::new(2, crc32fast::hash(b"ab"), Charset::new("ab"));
//! let result = search(&spec, 2, SearchPolicy::StopOnFirstMatch)?;
//!
//! assert_eq!(result.status, SearchStatus::TerminatedEarly);
//! assert_eq!(result.first().map(|m| m.candidate.as_str()), Some("ab"));
//! # Ok::<(), crcrecover_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`Checksum`]: Search against a checksum other than CRC32
//! - [`MatchSink`]: Receive matches as they are found
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod archive;
pub mod charset;
pub mod checksum;
pub mod error;
pub mod generator;
pub mod report;
pub mod search;
pub mod selection;

// Re-export primary types for convenience
pub use archive::{list_entries, sort_entries, ArchiveEntry};
pub use charset::Charset;
pub use checksum::{Checksum, Crc32};
pub use error::{Error, Result};
pub use generator::{generate, Candidates, SearchSpace};
pub use report::{CollectingSink, LineSink, Match, MatchSink, NullSink};
pub use search::{
    search, CancellationToken, SearchConfig, SearchPolicy, SearchResult, SearchSpec, SearchStatus,
    Searcher,
};
pub use selection::parse_selection;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
