use crate::cancel::CancelFlag;
use crate::snapshot::{PollPolicy, Snapshot};
use crate::tool::CommandLine;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// Opens the tool's own window and watches `destination` until the user
/// has extracted something, the window limit runs out, or a stop is
/// requested. The tool is closed in every case.
#[tracing::instrument(skip_all, fields(destination = %destination.display()))]
pub(crate) async fn await_manual(
    line: &CommandLine,
    destination: &Path,
    before: &Snapshot,
    limit: Duration,
    poll: &PollPolicy,
    cancel: &CancelFlag,
) -> Option<BTreeSet<String>> {
    let mut child = match line.to_command().spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(command = %line, error = %e, "Could not open extractor window");
            return None;
        },
    };
    let interval = poll.interval.max(Duration::from_millis(1));
    let deadline = Instant::now() + limit;
    let mut found = None;
    while Instant::now() < deadline {
        tokio::time::sleep(interval).await;
        if cancel.is_cancelled() {
            tracing::debug!("Stop requested while waiting for manual extraction");
            break;
        }
        match Snapshot::take(destination).await {
            Ok(after) => {
                let fresh = after.added_since(before);
                if !fresh.is_empty() {
                    found = Some(fresh);
                    break;
                }
            },
            Err(e) => tracing::warn!(error = %e, "Could not list destination folder"),
        }
    }
    if found.is_none() && !cancel.is_cancelled() {
        tracing::info!(seconds = limit.as_secs(), "Manual extraction window expired");
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Extractor window already closed");
    }
    found
}
