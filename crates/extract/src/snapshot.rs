use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Names of the entries directly inside a folder at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot(BTreeSet<String>);

impl Snapshot {
    /// Lists `dir`. A folder that doesn't exist yet is an empty snapshot.
    pub async fn take(dir: &Path) -> io::Result<Self> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        let mut names = BTreeSet::new();
        while let Some(entry) = entries.next_entry().await? {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(Self(names))
    }

    /// Entries present now that were absent from `before`.
    pub fn added_since(&self, before: &Snapshot) -> BTreeSet<String> {
        self.0.difference(&before.0).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for Snapshot {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How long to wait for files to appear after the extractor exits.
///
/// Some extractors hand work to a background process and return before the
/// files land, so the destination is checked more than once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Initial wait before the first check.
    pub settle: Duration,
    /// Number of checks, at least one is always made.
    pub attempts: u32,
    /// Wait between checks.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            attempts: 3,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollPolicy {
    /// Waits for new entries in `dir` relative to `before`, returning as
    /// soon as any show up. Returns an empty set if none ever do.
    pub async fn new_entries(&self, dir: &Path, before: &Snapshot) -> BTreeSet<String> {
        tokio::time::sleep(self.settle).await;
        let checks = self.attempts.max(1);
        for check in 1..=checks {
            match Snapshot::take(dir).await {
                Ok(after) => {
                    let fresh = after.added_since(before);
                    if !fresh.is_empty() {
                        return fresh;
                    }
                },
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Could not list destination folder"),
            }
            if check < checks {
                tokio::time::sleep(self.interval).await;
            }
        }
        BTreeSet::new()
    }
}
