//! Running an external extraction tool against one archive.
//!
//! The tool is treated as a black box: success is judged by its exit code
//! *and* by new entries showing up in the destination folder, because
//! extractors happily report success while writing nothing. Console output
//! is only sniffed for diagnostics.

mod cancel;
mod diagnose;
pub mod error;
mod interactive;
mod invoke;
#[cfg(feature = "mock")]
mod mock;
mod password;
mod snapshot;
mod tool;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

pub use crate::cancel::CancelFlag;
pub use crate::diagnose::{Diagnosis, diagnose};
pub use crate::invoke::Invoker;
#[cfg(feature = "mock")]
pub use crate::mock::{MockArchive, MockCall, MockExtractor};
pub use crate::password::{Password, candidates};
pub use crate::snapshot::{PollPolicy, Snapshot};
pub use crate::tool::{CommandLine, Extractor};

/// Time limits for talking to the extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    /// Upper bound for one non-interactive attempt.
    pub extract_timeout: Duration,
    /// How long the tool's window stays open waiting for the user.
    pub interactive_timeout: Duration,
    pub poll: PollPolicy,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            extract_timeout: Duration::from_secs(300),
            interactive_timeout: Duration::from_secs(60),
            poll: PollPolicy::default(),
        }
    }
}

/// One archive to extract.
#[derive(Clone, Copy, Debug)]
pub struct Request<'a> {
    pub archive: &'a Path,
    pub destination: &'a Path,
    /// Passwords to try, in order. May be empty.
    pub candidates: &'a [Password],
    /// Fall back to the tool's own window when every candidate fails.
    pub interactive: bool,
    pub cancel: &'a CancelFlag,
}

/// Which route produced the files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Via {
    /// Index into [`Request::candidates`].
    Candidate(usize),
    Interactive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    Extracted { via: Via, new_entries: BTreeSet<String> },
    /// Every route was tried without producing new entries.
    Failed { attempts: usize },
    /// A stop was requested before a route succeeded.
    Cancelled,
}

impl Extraction {
    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted { .. })
    }
}

/// Result of a single non-interactive attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Zero-based position of the password among the candidates.
    pub index: usize,
    pub total: usize,
    /// `None` when the tool didn't run to completion.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub spawn_error: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub diagnosis: Diagnosis,
    pub new_entries: BTreeSet<String>,
}

impl Attempt {
    pub fn new(index: usize, total: usize) -> Self {
        Self {
            index,
            total,
            exit_code: None,
            timed_out: false,
            spawn_error: None,
            stdout: String::new(),
            stderr: String::new(),
            diagnosis: Diagnosis::Inconclusive,
            new_entries: BTreeSet::new(),
        }
    }

    /// Clean exit *and* something new in the destination.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && !self.new_entries.is_empty()
    }
}

/// Observer for the individual steps of an extraction. Every method
/// defaults to doing nothing.
pub trait Progress: Send + Sync {
    fn attempt_started(&self, _archive: &Path, _index: usize, _total: usize, _password: &Password) {}
    fn attempt_finished(&self, _archive: &Path, _attempt: &Attempt) {}
    fn interactive_started(&self, _archive: &Path, _limit: Duration) {}
}

impl Progress for () {}

/// Something that can turn an archive into files.
#[async_trait]
pub trait Extract: Send + Sync {
    /// Tries every candidate password in order, stopping at the first that
    /// produces new entries in the destination, then optionally falls back
    /// to interactive extraction.
    ///
    /// The destination is created if needed. Only problems that make the
    /// request itself impossible (missing archive, unusable destination) are
    /// errors; failed attempts are reported as [`Extraction::Failed`].
    async fn extract(&self, request: Request<'_>, progress: &dyn Progress) -> Result<Extraction>;
}

#[async_trait]
impl<T: Extract + ?Sized> Extract for std::sync::Arc<T> {
    async fn extract(&self, request: Request<'_>, progress: &dyn Progress) -> Result<Extraction> {
        (**self).extract(request, progress).await
    }
}
