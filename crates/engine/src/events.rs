use crate::summary::Summary;
use derive_more::Display;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use time::UtcDateTime;
use tokio::sync::mpsc::UnboundedSender;
use unravel_extract::{Diagnosis, Via};

/// Marks the first and last record of a run, so that log consumers can cut
/// a continuous stream into runs.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Tag {
    #[display("start")]
    Start,
    #[display("end")]
    End,
}

/// Something the traversal did or ran into.
///
/// Events are emitted in traversal order: `RunStarted` exactly once before
/// anything else, `RunFinished` exactly once after everything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    RunStarted { root: PathBuf },
    VisitStarted { dir: PathBuf },
    /// The folder holds an executable and is treated as finished. Its
    /// subfolders are not visited.
    Stopped { dir: PathBuf, marker: String },
    /// Nothing to extract here; subfolders are still visited.
    NoArchives { dir: PathBuf },
    RoundStarted { dir: PathBuf, round: usize },
    Renamed { dir: PathBuf, from: String, to: String },
    ExtractionStarted { archive: PathBuf, candidates: usize },
    AttemptFinished {
        archive: PathBuf,
        /// One-based.
        attempt: usize,
        total: usize,
        exit_code: Option<i32>,
        timed_out: bool,
        diagnosis: Diagnosis,
        new_entries: usize,
    },
    InteractiveStarted { archive: PathBuf, seconds: u64 },
    Extracted { archive: PathBuf, via: Via, new_entries: Vec<String> },
    ExtractionFailed { archive: PathBuf, attempts: usize },
    /// The extractor couldn't even be asked, e.g. the archive vanished.
    ExtractionError { archive: PathBuf, message: String },
    /// Still making progress when the round limit was hit.
    RoundsExhausted { dir: PathBuf, rounds: usize },
    DirectoryError { dir: PathBuf, message: String },
    Cancelled { dir: PathBuf },
    RunFinished { summary: Summary },
}

fn name(path: &Path) -> String {
    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().into_owned()
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunStarted { root } => write!(f, "Processing {}", root.display()),
            Self::VisitStarted { dir } => write!(f, "Checking folder {}", name(dir)),
            Self::Stopped { dir, marker } => write!(f, "Found executable {marker} in {}, leaving it alone", name(dir)),
            Self::NoArchives { dir } => write!(f, "No archives in {}", name(dir)),
            Self::RoundStarted { dir, round } => write!(f, "Round {round} in {}", name(dir)),
            Self::Renamed { from, to, .. } => write!(f, "Renamed {from} to {to}"),
            Self::ExtractionStarted { archive, candidates } => {
                write!(f, "Extracting {} ({candidates} password(s) to try)", name(archive))
            },
            Self::AttemptFinished { attempt, total, exit_code, timed_out, diagnosis, new_entries, .. } => {
                write!(f, "Attempt {attempt}/{total}: ")?;
                match (timed_out, exit_code) {
                    (true, _) => f.write_str("timed out")?,
                    (false, Some(code)) => write!(f, "exit code {code}")?,
                    (false, None) => f.write_str("did not run")?,
                }
                write!(f, ", {new_entries} new entries, {diagnosis}")
            },
            Self::InteractiveStarted { archive, seconds } => {
                write!(f, "Opened {} for manual extraction, waiting up to {seconds}s", name(archive))
            },
            Self::Extracted { archive, via, new_entries } => {
                write!(f, "Extracted {} ", name(archive))?;
                match via {
                    Via::Candidate(index) => write!(f, "with password #{}", index + 1)?,
                    Via::Interactive => f.write_str("manually")?,
                }
                write!(f, ": {}", new_entries.join(", "))
            },
            Self::ExtractionFailed { archive, attempts } => {
                write!(f, "Could not extract {} after {attempts} attempt(s); archive kept", name(archive))
            },
            Self::ExtractionError { archive, message } => write!(f, "Could not extract {}: {message}", name(archive)),
            Self::RoundsExhausted { dir, rounds } => write!(f, "Gave up on {} after {rounds} rounds", name(dir)),
            Self::DirectoryError { dir, message } => write!(f, "Problem with folder {}: {message}", dir.display()),
            Self::Cancelled { dir } => write!(f, "Stopped by user in {}", name(dir)),
            Self::RunFinished { summary } => write!(f, "Finished, {summary}"),
        }
    }
}

/// A timestamped [`Event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub at: UtcDateTime,
    pub tag: Option<Tag>,
    pub event: Event,
}

impl Record {
    pub fn now(event: Event) -> Self {
        Self { at: UtcDateTime::now(), tag: None, event }
    }

    pub fn tagged(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Receives the records of a run.
///
/// Called from the traversal task; implementations must not block.
pub trait Reporter: Send + Sync {
    fn report(&self, record: Record);
}

impl Reporter for UnboundedSender<Record> {
    fn report(&self, record: Record) {
        // Nobody listening any more is not the traversal's problem.
        _ = self.send(record);
    }
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn report(&self, record: Record) {
        (**self).report(record);
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Vec<Record>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.records().into_iter().map(|r| r.event).collect()
    }
}

impl Reporter for Recorder {
    fn report(&self, record: Record) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}
