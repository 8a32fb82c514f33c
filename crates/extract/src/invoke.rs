use crate::diagnose::diagnose;
use crate::error::{ErrorKind, Result};
use crate::interactive::await_manual;
use crate::snapshot::Snapshot;
use crate::tool::Extractor;
use crate::{Attempt, Extract, Extraction, Progress, Request, Timings, Via};
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::BTreeSet;
use tracing::instrument;

/// Drives a real extractor process, one attempt per candidate password.
#[derive(Clone, Debug)]
pub struct Invoker {
    extractor: Extractor,
    timings: Timings,
}

impl Invoker {
    pub fn new(extractor: Extractor, timings: Timings) -> Self {
        Self { extractor, timings }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    async fn attempt(&self, request: &Request<'_>, before: &Snapshot, index: usize, progress: &dyn Progress) -> Attempt {
        let (archive, destination) = (request.archive, request.destination);
        let total = request.candidates.len();
        let password = &request.candidates[index];
        let line = self.extractor.extract_command(archive, destination, password);
        progress.attempt_started(archive, index, total, password);
        tracing::debug!(command = %line, attempt = index + 1, total, "Running extractor");

        let mut attempt = Attempt::new(index, total);
        match tokio::time::timeout(self.timings.extract_timeout, line.to_command().output()).await {
            Ok(Ok(output)) => {
                attempt.exit_code = output.status.code();
                attempt.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                attempt.stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            },
            Ok(Err(e)) => {
                tracing::warn!(command = %line, error = %e, "Could not start extractor");
                attempt.spawn_error = Some(e.to_string());
            },
            Err(_) => {
                tracing::warn!(seconds = self.timings.extract_timeout.as_secs(), "Extractor timed out");
                attempt.timed_out = true;
            },
        }
        attempt.diagnosis = diagnose(&attempt.stdout, &attempt.stderr);
        // Only a clean exit can succeed; nothing else waits for files.
        if attempt.exit_code == Some(0) {
            attempt.new_entries = self.timings.poll.new_entries(destination, before).await;
        }
        attempt
    }
}

#[async_trait]
impl Extract for Invoker {
    #[instrument(skip_all, fields(archive = %request.archive.display()))]
    async fn extract(&self, request: Request<'_>, progress: &dyn Progress) -> Result<Extraction> {
        let (archive, destination) = (request.archive, request.destination);
        if !tokio::fs::try_exists(archive).await.or_raise(|| ErrorKind::Io)? {
            exn::bail!(ErrorKind::ArchiveMissing(archive.to_path_buf()));
        }
        tokio::fs::create_dir_all(destination)
            .await
            .or_raise(|| ErrorKind::Destination(destination.to_path_buf()))?;
        let before = Snapshot::take(destination)
            .await
            .or_raise(|| ErrorKind::Destination(destination.to_path_buf()))?;

        let total = request.candidates.len();
        for index in 0..total {
            if request.cancel.is_cancelled() {
                return Ok(Extraction::Cancelled);
            }
            let attempt = self.attempt(&request, &before, index, progress).await;
            progress.attempt_finished(archive, &attempt);
            if attempt.succeeded() {
                return Ok(Extraction::Extracted {
                    via: Via::Candidate(index),
                    new_entries: attempt.new_entries,
                });
            }
        }

        if request.interactive {
            if request.cancel.is_cancelled() {
                return Ok(Extraction::Cancelled);
            }
            let line = self.extractor.interactive_command(archive);
            progress.interactive_started(archive, self.timings.interactive_timeout);
            let limit = self.timings.interactive_timeout;
            let found: Option<BTreeSet<String>> =
                await_manual(&line, destination, &before, limit, &self.timings.poll, request.cancel).await;
            if let Some(new_entries) = found {
                return Ok(Extraction::Extracted { via: Via::Interactive, new_entries });
            }
            if request.cancel.is_cancelled() {
                return Ok(Extraction::Cancelled);
            }
        }
        Ok(Extraction::Failed { attempts: total })
    }
}
