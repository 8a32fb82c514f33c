use regex::Regex;
use std::sync::LazyLock;

static FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)wrong password|data error|crc failed|cannot open").unwrap());
static SUCCESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)everything is ok|files: |folders: ").unwrap());

/// What the extractor's console output claims happened.
///
/// Informational only; whether an attempt succeeded is decided by the exit
/// code and the destination folder, never by this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum Diagnosis {
    #[display("output reports an error")]
    ReportsFailure,
    #[display("output reports success")]
    ReportsSuccess,
    #[display("output is inconclusive")]
    Inconclusive,
}

/// Scans both output streams. Error indicators take precedence.
pub fn diagnose(stdout: &str, stderr: &str) -> Diagnosis {
    if FAILURE.is_match(stdout) || FAILURE.is_match(stderr) {
        Diagnosis::ReportsFailure
    } else if SUCCESS.is_match(stdout) || SUCCESS.is_match(stderr) {
        Diagnosis::ReportsSuccess
    } else {
        Diagnosis::Inconclusive
    }
}
