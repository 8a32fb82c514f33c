//! Top-level Error Types

use derive_more::{Display, Error};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration problem")]
    Config,
    #[display("no usable extraction tool; install Bandizip or pass --extractor")]
    Extractor,
    #[display("could not start the run")]
    Run,
    #[display("could not read the run history")]
    History,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
