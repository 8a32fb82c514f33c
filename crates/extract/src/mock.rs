//! Scripted extractor for testing.

use crate::error::{ErrorKind, Result};
use crate::snapshot::Snapshot;
use crate::{Attempt, CancelFlag, Diagnosis, Extract, Extraction, Progress, Request, Via};
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// How one archive (matched by file name) behaves when extracted.
#[derive(Clone, Debug, Default)]
pub struct MockArchive {
    password: Option<String>,
    files: Vec<(PathBuf, Vec<u8>)>,
    manual_only: bool,
    cancels: Option<CancelFlag>,
    intact: Option<Vec<u8>>,
}

impl MockArchive {
    /// Extracts with whichever password is tried first.
    pub fn open(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        Self {
            files: files.into_iter().map(|(p, d)| (p.into(), d.into())).collect(),
            ..Self::default()
        }
    }

    /// Extracts only with `password`.
    pub fn protected(
        password: impl Into<String>,
        files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>,
    ) -> Self {
        Self { password: Some(password.into()), ..Self::open(files) }
    }

    /// Never extracts, whatever the password.
    pub fn broken() -> Self {
        Self::default()
    }

    /// Only extracts through the interactive fallback.
    pub fn manual(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        Self { manual_only: true, ..Self::open(files) }
    }

    /// Requests a stop as soon as this archive is extracted.
    pub fn cancels(mut self, flag: &CancelFlag) -> Self {
        self.cancels = Some(flag.clone());
        self
    }

    /// Only extracts while the archive file holds exactly `content`, so a
    /// damaged copy fails until something overwrites it.
    pub fn intact_when(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.intact = Some(content.into());
        self
    }

    fn accepts(&self, password: &str) -> bool {
        !self.manual_only && !self.files.is_empty() && self.password.as_deref().is_none_or(|p| p == password)
    }
}

/// One call to [`MockExtractor::extract`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockCall {
    pub archive: PathBuf,
    pub destination: PathBuf,
    /// Passwords actually tried, in order.
    pub passwords: Vec<String>,
    pub interactive: bool,
}

/// In-memory stand-in for a real extractor.
///
/// Archives are looked up by file name; unknown names behave like
/// [`MockArchive::broken`]. Extraction really writes the scripted files into
/// the destination so that traversal code sees them, and success is judged
/// the same way as for a real tool: new entries must appear.
///
/// ```
/// use unravel_extract::{MockArchive, MockExtractor};
///
/// let extractor = MockExtractor::new([
///     ("outer.zip", MockArchive::open([("inner.rar", b"Rar!")])),
///     ("inner.rar", MockArchive::protected("abc", [("movie.mkv", b"...")])),
/// ]);
/// assert!(extractor.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MockExtractor {
    archives: HashMap<String, MockArchive>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockExtractor {
    pub fn new(archives: impl IntoIterator<Item = (impl Into<String>, MockArchive)>) -> Self {
        Self {
            archives: archives.into_iter().map(|(n, a)| (n.into(), a)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// File names of the archives extracted so far, oldest first.
    pub fn archive_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.archive.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    async fn unpack(script: &MockArchive, destination: &Path) -> Result<std::collections::BTreeSet<String>> {
        let before = Snapshot::take(destination).await.or_raise(|| ErrorKind::Destination(destination.into()))?;
        for (path, data) in &script.files {
            let target = destination.join(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io)?;
            }
            tokio::fs::write(&target, data).await.or_raise(|| ErrorKind::Io)?;
        }
        let after = Snapshot::take(destination).await.or_raise(|| ErrorKind::Destination(destination.into()))?;
        if let Some(flag) = &script.cancels {
            flag.cancel();
        }
        Ok(after.added_since(&before))
    }
}

#[async_trait]
impl Extract for MockExtractor {
    async fn extract(&self, request: Request<'_>, progress: &dyn Progress) -> Result<Extraction> {
        if !tokio::fs::try_exists(request.archive).await.or_raise(|| ErrorKind::Io)? {
            exn::bail!(ErrorKind::ArchiveMissing(request.archive.to_path_buf()));
        }
        tokio::fs::create_dir_all(request.destination)
            .await
            .or_raise(|| ErrorKind::Destination(request.destination.to_path_buf()))?;
        let name = request.archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let mut script = self.archives.get(&name).cloned().unwrap_or_default();
        if let Some(content) = &script.intact {
            let actual = tokio::fs::read(request.archive).await.or_raise(|| ErrorKind::Io)?;
            if &actual != content {
                script.files.clear();
            }
        }
        let mut call = MockCall {
            archive: request.archive.to_path_buf(),
            destination: request.destination.to_path_buf(),
            passwords: Vec::new(),
            interactive: false,
        };

        let total = request.candidates.len();
        let mut outcome = None;
        for (index, password) in request.candidates.iter().enumerate() {
            if request.cancel.is_cancelled() {
                outcome = Some(Extraction::Cancelled);
                break;
            }
            progress.attempt_started(request.archive, index, total, password);
            call.passwords.push(password.expose().to_string());
            let mut attempt = Attempt::new(index, total);
            if script.accepts(password.expose()) {
                attempt.new_entries = Self::unpack(&script, request.destination).await?;
                attempt.exit_code = Some(0);
                attempt.diagnosis = Diagnosis::ReportsSuccess;
            } else {
                attempt.exit_code = Some(2);
                attempt.diagnosis = Diagnosis::ReportsFailure;
            }
            progress.attempt_finished(request.archive, &attempt);
            if attempt.succeeded() {
                outcome = Some(Extraction::Extracted { via: Via::Candidate(index), new_entries: attempt.new_entries });
                break;
            }
        }

        let outcome = match outcome {
            Some(outcome) => outcome,
            None if request.interactive && request.cancel.is_cancelled() => Extraction::Cancelled,
            None if request.interactive => {
                call.interactive = true;
                let new_entries = if script.files.is_empty() {
                    Default::default()
                } else {
                    Self::unpack(&script, request.destination).await?
                };
                if new_entries.is_empty() {
                    Extraction::Failed { attempts: total }
                } else {
                    Extraction::Extracted { via: Via::Interactive, new_entries }
                }
            },
            None => Extraction::Failed { attempts: total },
        };
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        Ok(outcome)
    }
}
