//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file doesn't exist.
    #[display("configuration file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    /// The merged configuration doesn't have the expected shape.
    #[display("invalid configuration")]
    Invalid,
    /// No home directory to derive the platform directories from.
    #[display("could not determine the configuration directory")]
    NoHomeDirectory,
    /// Passwords can only be edited in JSON configuration files.
    #[display("password list can only be edited in a JSON file: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The file is not a JSON object with an array of strings under `passwords`.
    #[display("malformed configuration file: {}", _0.display())]
    Malformed(#[error(not(source))] PathBuf),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
