//! Engine Error Types
//!
//! Only problems that prevent a run from starting are errors. Everything
//! that goes wrong during traversal is reported as an event and counted in
//! the run summary.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The folder to process doesn't exist or isn't a folder.
    #[display("not a folder: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
