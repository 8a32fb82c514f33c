use crate::error::{ErrorKind, Result};
use crate::events::{Event, Record, Reporter, Tag};
use crate::options::Options;
use crate::summary::{Outcome, Summary};
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tracing::instrument;
use unravel_extract::{Attempt, CancelFlag, Extract, Extraction, Password, Progress, Request};
use unravel_names::{NameKind, classify};

/// Whether traversal should keep going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Cancelled,
    /// The folder stopped being listable; already reported.
    Unreadable,
}

/// Regular files and real subfolders directly inside a folder, sorted by
/// name. Symlinked folders are not followed.
#[derive(Debug, Default)]
struct Listing {
    files: Vec<String>,
    dirs: Vec<PathBuf>,
}

impl Listing {
    async fn read(dir: &Path) -> io::Result<Self> {
        let mut listing = Self::default();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                listing.dirs.push(entry.path());
                continue;
            }
            // Symlinks to files count as files, like any other reader would see them.
            let is_file = file_type.is_file() || tokio::fs::metadata(entry.path()).await.is_ok_and(|m| m.is_file());
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => listing.files.push(name),
                Err(raw) => tracing::debug!(name = ?raw, "Skipping file with non UTF-8 name"),
            }
        }
        listing.files.sort();
        listing.dirs.sort();
        Ok(listing)
    }

    /// Every entry name in `dir`, whatever its type.
    async fn names(dir: &Path) -> io::Result<HashSet<String>> {
        let mut names = HashSet::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(name) = entry.file_name().into_string() {
                names.insert(name);
            }
        }
        Ok(names)
    }
}

/// Turns the extractor's per-attempt callbacks into events.
struct Forward<'a, R>(&'a R);

impl<R: Reporter> Progress for Forward<'_, R> {
    fn attempt_started(&self, archive: &Path, index: usize, total: usize, password: &Password) {
        tracing::debug!(archive = %archive.display(), attempt = index + 1, total, %password, "Trying password");
    }

    fn attempt_finished(&self, archive: &Path, attempt: &Attempt) {
        self.0.report(Record::now(Event::AttemptFinished {
            archive: archive.to_path_buf(),
            attempt: attempt.index + 1,
            total: attempt.total,
            exit_code: attempt.exit_code,
            timed_out: attempt.timed_out,
            diagnosis: attempt.diagnosis,
            new_entries: attempt.new_entries.len(),
        }));
    }

    fn interactive_started(&self, archive: &Path, limit: Duration) {
        self.0.report(Record::now(Event::InteractiveStarted {
            archive: archive.to_path_buf(),
            seconds: limit.as_secs(),
        }));
    }
}

/// Owns everything a run needs: options, the extractor, where to report,
/// and the stop flag.
pub struct Engine<X, R> {
    extractor: X,
    reporter: R,
    options: Options,
    cancel: CancelFlag,
}

impl<X: Extract, R: Reporter> Engine<X, R> {
    pub fn new(extractor: X, reporter: R, options: Options) -> Self {
        Self { extractor, reporter, options, cancel: CancelFlag::new() }
    }

    /// Shares an existing stop flag instead of a private one.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for requesting a stop from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn emit(&self, event: Event) {
        self.reporter.report(Record::now(event));
    }

    /// Processes `root` and everything below it.
    ///
    /// Fails only if `root` is not an existing folder, in which case
    /// nothing is reported. A stop request ends the run early with
    /// [`Outcome::Cancelled`].
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn run(&self, root: &Path) -> Result<Summary> {
        let is_dir = tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir());
        if !is_dir {
            exn::bail!(ErrorKind::InvalidRoot(root.to_path_buf()));
        }
        self.reporter.report(Record::now(Event::RunStarted { root: root.to_path_buf() }).tagged(Tag::Start));
        let mut summary = Summary::default();
        if self.visit(root, &mut summary).await == Flow::Cancelled {
            summary.outcome = Outcome::Cancelled;
        }
        tracing::info!(%summary, "Run finished");
        self.reporter.report(Record::now(Event::RunFinished { summary }).tagged(Tag::End));
        Ok(summary)
    }

    fn cancelled(&self, dir: &Path) -> bool {
        if self.cancel.is_cancelled() {
            self.emit(Event::Cancelled { dir: dir.to_path_buf() });
            return true;
        }
        false
    }

    fn directory_error(&self, dir: &Path, error: &io::Error, summary: &mut Summary) {
        tracing::warn!(dir = %dir.display(), %error, "Folder problem");
        summary.directory_errors += 1;
        self.emit(Event::DirectoryError { dir: dir.to_path_buf(), message: error.to_string() });
    }

    fn visit<'a>(&'a self, dir: &'a Path, summary: &'a mut Summary) -> Pin<Box<dyn Future<Output = Flow> + Send + 'a>> {
        Box::pin(async move {
            if self.cancelled(dir) {
                return Flow::Cancelled;
            }
            summary.directories += 1;
            self.emit(Event::VisitStarted { dir: dir.to_path_buf() });
            let listing = match Listing::read(dir).await {
                Ok(listing) => listing,
                Err(e) => {
                    self.directory_error(dir, &e, summary);
                    return Flow::Continue;
                },
            };

            let verdict = classify(&listing.files, self.options.eligibility_threshold);
            if verdict.has_executable {
                let marker = listing.files.iter().find(|f| NameKind::of(f) == NameKind::Executable);
                summary.stopped += 1;
                self.emit(Event::Stopped {
                    dir: dir.to_path_buf(),
                    marker: marker.cloned().unwrap_or_default(),
                });
                return Flow::Continue;
            }
            if !verdict.has_archive {
                self.emit(Event::NoArchives { dir: dir.to_path_buf() });
            } else {
                match self.converge(dir, summary).await {
                    Flow::Cancelled => return Flow::Cancelled,
                    Flow::Unreadable => return Flow::Continue,
                    Flow::Continue => {},
                }
            }

            // Listed again: extraction may have created new subfolders.
            let dirs = match Listing::read(dir).await {
                Ok(listing) => listing.dirs,
                Err(e) => {
                    self.directory_error(dir, &e, summary);
                    return Flow::Continue;
                },
            };
            for sub in dirs {
                if self.visit(&sub, summary).await == Flow::Cancelled {
                    return Flow::Cancelled;
                }
            }
            Flow::Continue
        })
    }

    /// Extracts one archive per round until a round extracts nothing.
    #[instrument(skip(self, summary), fields(dir = %dir.display()))]
    async fn converge(&self, dir: &Path, summary: &mut Summary) -> Flow {
        // Both spellings of everything extracted during this visit. Failures
        // are retried next round: a later archive may have replaced them.
        let mut processed = HashSet::new();
        let candidates = self.options.candidates();

        for round in 1..=self.options.max_rounds {
            if self.cancelled(dir) {
                return Flow::Cancelled;
            }
            self.emit(Event::RoundStarted { dir: dir.to_path_buf(), round });
            let mut files = match Listing::read(dir).await {
                Ok(listing) => listing.files,
                Err(e) => {
                    self.directory_error(dir, &e, summary);
                    return Flow::Unreadable;
                },
            };

            let mut progressed = false;
            for index in 0..files.len() {
                let name = files[index].clone();
                if processed.contains(&name) {
                    continue;
                }
                if self.cancelled(dir) {
                    return Flow::Cancelled;
                }
                let archive_name = match NameKind::of(&name) {
                    NameKind::Malformed => match self.repair(dir, &name).await {
                        Ok(fixed) => {
                            summary.renamed += 1;
                            files[index] = fixed.clone();
                            fixed
                        },
                        Err(e) => {
                            self.directory_error(dir, &e, summary);
                            continue;
                        },
                    },
                    NameKind::Archive if classify(&files, self.options.eligibility_threshold).eligible_single => name.clone(),
                    _ => continue,
                };

                let archive = dir.join(&archive_name);
                self.emit(Event::ExtractionStarted { archive: archive.clone(), candidates: candidates.len() });
                let request = Request {
                    archive: &archive,
                    destination: dir,
                    candidates: &candidates,
                    interactive: self.options.interactive,
                    cancel: &self.cancel,
                };
                match self.extractor.extract(request, &Forward(&self.reporter)).await {
                    Ok(Extraction::Extracted { via, new_entries }) => {
                        summary.extracted += 1;
                        self.emit(Event::Extracted { archive, via, new_entries: new_entries.into_iter().collect() });
                        processed.insert(name);
                        processed.insert(archive_name);
                        progressed = true;
                        break;
                    },
                    Ok(Extraction::Failed { attempts }) => {
                        summary.failed += 1;
                        self.emit(Event::ExtractionFailed { archive, attempts });
                    },
                    Ok(Extraction::Cancelled) => {
                        self.emit(Event::Cancelled { dir: dir.to_path_buf() });
                        return Flow::Cancelled;
                    },
                    Err(e) => {
                        tracing::warn!(archive = %archive.display(), error = ?e, "Extraction could not run");
                        summary.failed += 1;
                        self.emit(Event::ExtractionError { archive, message: (*e).to_string() });
                    },
                }
            }

            if !progressed {
                return Flow::Continue;
            }
            if round == self.options.max_rounds {
                self.emit(Event::RoundsExhausted { dir: dir.to_path_buf(), rounds: round });
            }
        }
        Flow::Continue
    }

    /// Renames a malformed archive to its repaired, collision-free name.
    async fn repair(&self, dir: &Path, name: &str) -> io::Result<String> {
        let Some(correction) = unravel_names::correct(name) else {
            return Ok(name.to_string());
        };
        let taken = Listing::names(dir).await?;
        let fixed = correction.resolve(|candidate| taken.contains(candidate));
        tokio::fs::rename(dir.join(name), dir.join(&fixed)).await?;
        tracing::info!(from = name, to = %fixed, "Repaired archive name");
        self.emit(Event::Renamed { dir: dir.to_path_buf(), from: name.to_string(), to: fixed.clone() });
        Ok(fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Recorder;
    use std::sync::Arc;
    use unravel_extract::{MockArchive, MockExtractor, Via};

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    fn setup(extractor: MockExtractor, options: Options) -> (Engine<Arc<MockExtractor>, Arc<Recorder>>, Arc<MockExtractor>, Arc<Recorder>) {
        let extractor = Arc::new(extractor);
        let recorder = Arc::new(Recorder::new());
        (Engine::new(extractor.clone(), recorder.clone(), options), extractor, recorder)
    }

    fn passwords(values: &[&str]) -> Vec<Password> {
        values.iter().map(|v| Password::from(*v)).collect()
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let tmp = tempfile::tempdir().unwrap();
        let (engine, _, recorder) = setup(MockExtractor::default(), Options::default());
        let err = engine.run(&tmp.path().join("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
        let file = tmp.path().join("file.txt");
        touch(&file);
        assert!(engine.run(&file).await.is_err());
        assert!(recorder.records().is_empty());
    }

    #[tokio::test]
    async fn test_no_archives_no_extraction() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("photo.jpg"));
        touch(&tmp.path().join("child/notes.txt"));
        let (engine, extractor, recorder) = setup(MockExtractor::default(), Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();
        assert!(extractor.calls().is_empty());
        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.directories, 2);
        let events = recorder.events();
        assert!(events.contains(&Event::NoArchives { dir: tmp.path().to_path_buf() }));
        assert!(events.contains(&Event::VisitStarted { dir: tmp.path().join("child") }));
    }

    #[tokio::test]
    async fn test_malformed_name_repaired_and_extracted() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("movie.rar删"));
        let mock = MockExtractor::new([("movie.rar", MockArchive::open([("movie.mkv", b"video")]))]);
        let (engine, extractor, recorder) = setup(mock, Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();

        assert_eq!(summary.renamed, 1);
        assert_eq!(summary.extracted, 1);
        assert!(tmp.path().join("movie.rar").is_file());
        assert!(!tmp.path().join("movie.rar删").exists());
        assert!(tmp.path().join("movie.mkv").is_file());
        let calls = extractor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].passwords, [""]);
        assert_eq!(calls[0].destination, tmp.path());
        assert!(recorder.events().contains(&Event::Renamed {
            dir: tmp.path().to_path_buf(),
            from: "movie.rar删".into(),
            to: "movie.rar".into(),
        }));
    }

    #[tokio::test]
    async fn test_repair_avoids_collision() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("movie.rar"));
        touch(&tmp.path().join("movie.rar删"));
        touch(&tmp.path().join("a.txt"));
        touch(&tmp.path().join("b.txt"));
        let mock = MockExtractor::new([("movie_1.rar", MockArchive::open([("movie.mkv", b"video")]))]);
        let (engine, extractor, _) = setup(mock, Options::default());
        engine.run(tmp.path()).await.unwrap();
        assert!(tmp.path().join("movie.rar").is_file());
        assert!(tmp.path().join("movie_1.rar").is_file());
        assert!(extractor.archive_names().contains(&"movie_1.rar".to_string()));
    }

    #[tokio::test]
    async fn test_repair_avoids_folder_with_same_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("movie.rar")).unwrap();
        touch(&tmp.path().join("movie.rar删"));
        let mock = MockExtractor::new([("movie_1.rar", MockArchive::open([("movie.mkv", b"video")]))]);
        let (engine, extractor, recorder) = setup(mock, Options::default());
        engine.run(tmp.path()).await.unwrap();
        assert!(tmp.path().join("movie.rar").is_dir());
        assert_eq!(extractor.archive_names(), ["movie_1.rar"]);
        assert!(recorder.events().contains(&Event::Renamed {
            dir: tmp.path().to_path_buf(),
            from: "movie.rar删".into(),
            to: "movie_1.rar".into(),
        }));
    }

    #[tokio::test]
    async fn test_executable_stops_folder() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("app.exe"));
        touch(&tmp.path().join("data.zip"));
        touch(&tmp.path().join("nested/inner.zip"));
        let mock = MockExtractor::new([
            ("data.zip", MockArchive::open([("x.txt", b"x")])),
            ("inner.zip", MockArchive::open([("y.txt", b"y")])),
        ]);
        let (engine, extractor, recorder) = setup(mock, Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();
        assert!(extractor.calls().is_empty());
        assert_eq!(summary.stopped, 1);
        assert_eq!(summary.directories, 1);
        assert!(recorder.events().contains(&Event::Stopped { dir: tmp.path().to_path_buf(), marker: "app.exe".into() }));
    }

    #[tokio::test]
    async fn test_executable_in_sibling_only_stops_sibling() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a/setup.msi"));
        touch(&tmp.path().join("b/data.zip"));
        let mock = MockExtractor::new([("data.zip", MockArchive::open([("x.txt", b"x")]))]);
        let (engine, extractor, _) = setup(mock, Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.archive_names(), ["data.zip"]);
        assert_eq!(summary.stopped, 1);
        assert!(tmp.path().join("b/x.txt").is_file());
    }

    #[tokio::test]
    async fn test_password_order_and_failure() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("locked.7z"));
        let mock = MockExtractor::new([("locked.7z", MockArchive::protected("zzz", [("secret.txt", b"s")]))]);
        let options = Options { passwords: passwords(&["abc", "123"]), ..Options::default() };
        let (engine, extractor, recorder) = setup(mock, options);
        let summary = engine.run(tmp.path()).await.unwrap();
        let calls = extractor.calls();
        // A round without progress ends the visit, so there is no retry.
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].passwords, ["", "abc", "123"]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.extracted, 0);
        assert!(tmp.path().join("locked.7z").is_file());
        assert!(recorder.events().contains(&Event::ExtractionFailed { archive: tmp.path().join("locked.7z"), attempts: 3 }));
    }

    #[tokio::test]
    async fn test_stored_password_wins() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("locked.7z"));
        let mock = MockExtractor::new([("locked.7z", MockArchive::protected("abc", [("secret.txt", b"s")]))]);
        let options = Options { passwords: passwords(&["abc", "123"]), ..Options::default() };
        let (engine, extractor, recorder) = setup(mock, options);
        engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.calls()[0].passwords, ["", "abc"]);
        assert!(recorder.events().iter().any(|e| matches!(e, Event::Extracted { via: Via::Candidate(1), .. })));
    }

    #[tokio::test]
    async fn test_has_password_skips_empty() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("locked.7z"));
        let mock = MockExtractor::new([("locked.7z", MockArchive::protected("abc", [("secret.txt", b"s")]))]);
        let options = Options { passwords: passwords(&["abc"]), has_password: true, ..Options::default() };
        let (engine, extractor, _) = setup(mock, options);
        engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.calls()[0].passwords, ["abc"]);
    }

    #[tokio::test]
    async fn test_interactive_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("odd.rar"));
        let mock = MockExtractor::new([("odd.rar", MockArchive::manual([("done.txt", b"d")]))]);
        let options = Options { interactive: true, ..Options::default() };
        let (engine, extractor, _) = setup(mock, options);
        let summary = engine.run(tmp.path()).await.unwrap();
        assert_eq!(summary.extracted, 1);
        assert!(extractor.calls()[0].interactive);
    }

    #[tokio::test]
    async fn test_nested_archives_converge() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("outer.zip删"));
        let mock = MockExtractor::new([
            ("outer.zip", MockArchive::open([("middle.7z (1)", b"7z")])),
            ("middle.7z", MockArchive::open([("inner.tar.gz.part", b"gz")])),
            ("inner.tar.gz", MockArchive::open([("payload/readme.txt", b"hi")])),
        ]);
        let (engine, extractor, _) = setup(mock, Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.archive_names(), ["outer.zip", "middle.7z", "inner.tar.gz"]);
        assert_eq!(summary.renamed, 3);
        assert_eq!(summary.extracted, 3);
        // Recursion reached the folder created by the last extraction.
        assert_eq!(summary.directories, 2);
        assert!(tmp.path().join("payload/readme.txt").is_file());
        // Sources are kept.
        assert!(tmp.path().join("outer.zip").is_file());
        assert!(tmp.path().join("middle.7z").is_file());
    }

    fn ineligible_pair() -> (tempfile::TempDir, MockExtractor) {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.zip", "b.zip", "cover.jpg"] {
            touch(&tmp.path().join(name));
        }
        let mock = MockExtractor::new([
            ("a.zip", MockArchive::open([("a.txt", b"a")])),
            ("b.zip", MockArchive::open([("b.txt", b"b")])),
        ]);
        (tmp, mock)
    }

    #[tokio::test]
    async fn test_ineligible_archives_left_alone() {
        let (tmp, mock) = ineligible_pair();
        let (engine, extractor, _) = setup(mock, Options::default());
        engine.run(tmp.path()).await.unwrap();
        assert!(extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_raised_threshold_makes_archive_eligible() {
        let (tmp, mock) = ineligible_pair();
        let options = Options { eligibility_threshold: 3, ..Options::default() };
        let (engine, extractor, _) = setup(mock, options);
        engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.archive_names(), ["a.zip"]);
    }

    #[tokio::test]
    async fn test_failed_archive_retried_after_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("inner.zip"), b"broken").unwrap();
        touch(&tmp.path().join("outer.zip删"));
        let mock = MockExtractor::new([
            ("outer.zip", MockArchive::open([("inner.zip", b"good".as_slice()), ("outer.txt", b"o".as_slice())])),
            ("inner.zip", MockArchive::open([("payload/readme.txt", b"hi")]).intact_when(b"good".as_slice())),
        ]);
        let options = Options { eligibility_threshold: 10, ..Options::default() };
        let (engine, extractor, _) = setup(mock, options);
        let summary = engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.archive_names(), ["inner.zip", "outer.zip", "inner.zip"]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.extracted, 2);
        assert!(tmp.path().join("payload/readme.txt").is_file());
    }

    #[tokio::test]
    async fn test_round_limit() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("1.zip"));
        let mock = MockExtractor::new([
            ("1.zip", MockArchive::open([("2.zip", b"z")])),
            ("2.zip", MockArchive::open([("3.zip", b"z")])),
            ("3.zip", MockArchive::open([("4.zip", b"z")])),
        ]);
        let options = Options { max_rounds: 2, eligibility_threshold: 10, ..Options::default() };
        let (engine, extractor, recorder) = setup(mock, options);
        engine.run(tmp.path()).await.unwrap();
        assert_eq!(extractor.archive_names(), ["1.zip", "2.zip"]);
        assert!(recorder.events().contains(&Event::RoundsExhausted { dir: tmp.path().to_path_buf(), rounds: 2 }));
    }

    #[tokio::test]
    async fn test_cancel_mid_round() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("outer.zip"));
        touch(&tmp.path().join("sub/other.zip"));
        let cancel = CancelFlag::new();
        let mock = MockExtractor::new([
            ("outer.zip", MockArchive::open([("inner.zip", b"z")]).cancels(&cancel)),
            ("inner.zip", MockArchive::open([("x.txt", b"x")])),
            ("other.zip", MockArchive::open([("y.txt", b"y")])),
        ]);
        let (engine, extractor, recorder) = setup(mock, Options::default());
        let engine = engine.with_cancel(cancel);
        let summary = engine.run(tmp.path()).await.unwrap();
        // The in-flight extraction completed; nothing after it ran.
        assert_eq!(extractor.archive_names(), ["outer.zip"]);
        assert!(tmp.path().join("inner.zip").is_file());
        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(summary.extracted, 1);
        let records = recorder.records();
        assert_eq!(records.first().and_then(|r| r.tag), Some(Tag::Start));
        assert_eq!(records.last().and_then(|r| r.tag), Some(Tag::End));
        assert!(matches!(&records.last().unwrap().event, Event::RunFinished { summary } if summary.is_cancelled()));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.zip"));
        let (engine, extractor, _) = setup(MockExtractor::default(), Options::default());
        engine.cancel_flag().cancel();
        let summary = engine.run(tmp.path()).await.unwrap();
        assert!(extractor.calls().is_empty());
        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(summary.directories, 0);
    }

    /// Extractor that changes the filesystem behind the engine's back.
    struct Tampering<F> {
        tamper: F,
        outcome: Extraction,
        calls: std::sync::Mutex<Vec<PathBuf>>,
    }

    impl<F: Fn(&Path) + Send + Sync> Tampering<F> {
        fn new(tamper: F, outcome: Extraction) -> Self {
            Self { tamper, outcome, calls: Default::default() }
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl<F: Fn(&Path) + Send + Sync> Extract for Tampering<F> {
        async fn extract(&self, request: Request<'_>, _progress: &dyn Progress) -> unravel_extract::error::Result<Extraction> {
            self.calls.lock().unwrap().push(request.archive.to_path_buf());
            (self.tamper)(request.archive);
            Ok(self.outcome.clone())
        }
    }

    #[tokio::test]
    async fn test_failed_rename_reported_and_run_continues() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.zip"));
        touch(&tmp.path().join("b.rar删"));
        let vanished = tmp.path().join("b.rar删");
        let extractor = Tampering::new(
            move |archive: &Path| {
                if archive.ends_with("a.zip") {
                    std::fs::remove_file(&vanished).unwrap();
                }
            },
            Extraction::Failed { attempts: 1 },
        );
        let recorder = Arc::new(Recorder::new());
        let engine = Engine::new(extractor, recorder.clone(), Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();

        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.directory_errors, 1);
        assert_eq!(summary.renamed, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(engine.extractor.calls(), [tmp.path().join("a.zip")]);
        assert!(recorder.events().iter().any(|e| matches!(e, Event::DirectoryError { dir, .. } if dir == tmp.path())));
        assert!(!recorder.events().iter().any(|e| matches!(e, Event::Renamed { .. })));
    }

    #[tokio::test]
    async fn test_folder_replaced_mid_visit_does_not_abort() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        touch(&sub.join("a.zip"));
        touch(&tmp.path().join("z/b.zip"));
        let replaced = sub.clone();
        let extractor = Tampering::new(
            move |archive: &Path| {
                if archive.starts_with(&replaced) {
                    std::fs::remove_dir_all(&replaced).unwrap();
                    std::fs::write(&replaced, b"now a file").unwrap();
                }
            },
            Extraction::Extracted { via: Via::Candidate(0), new_entries: ["x.txt".to_string()].into() },
        );
        let recorder = Arc::new(Recorder::new());
        let engine = Engine::new(extractor, recorder.clone(), Options::default());
        let summary = engine.run(tmp.path()).await.unwrap();

        assert_eq!(summary.outcome, Outcome::Completed);
        // Reported once, even though the folder is never listed again.
        assert_eq!(summary.directory_errors, 1);
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.directories, 3);
        assert_eq!(engine.extractor.calls(), [sub.join("a.zip"), tmp.path().join("z/b.zip")]);
        assert!(recorder.events().iter().any(|e| matches!(e, Event::DirectoryError { dir, .. } if dir == &sub)));
    }
}
