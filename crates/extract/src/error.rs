//! Extraction Error Types
//!
//! Hard failures only. A wrong password, a crashed tool or an attempt that
//! ran out of time are ordinary outcomes reported through
//! [`Extraction`](crate::Extraction), not errors.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("extraction tool not detected on your system")]
    ExtractorNotFound,
    /// An explicitly configured extractor path does not point at an executable.
    #[display("extraction tool not usable: {}", _0.display())]
    ExtractorInvalid(#[error(not(source))] PathBuf),
    #[display("archive does not exist: {}", _0.display())]
    ArchiveMissing(#[error(not(source))] PathBuf),
    /// The destination folder could not be created or listed.
    #[display("cannot prepare destination folder: {}", _0.display())]
    Destination(#[error(not(source))] PathBuf),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
