use derive_more::Display;

/// How a run ended.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Outcome {
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
}

/// Totals for one run.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[display(
    "{outcome}: {directories} folder(s) visited, {renamed} name(s) repaired, {extracted} archive(s) extracted, \
     {failed} failed, {stopped} stopped, {directory_errors} folder error(s)"
)]
pub struct Summary {
    pub outcome: Outcome,
    pub directories: usize,
    pub renamed: usize,
    pub extracted: usize,
    pub failed: usize,
    /// Folders left alone because they hold an executable.
    pub stopped: usize,
    pub directory_errors: usize,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            outcome: Outcome::Completed,
            directories: 0,
            renamed: 0,
            extracted: 0,
            failed: 0,
            stopped: 0,
            directory_errors: 0,
        }
    }
}

impl Summary {
    pub fn is_cancelled(&self) -> bool {
        self.outcome == Outcome::Cancelled
    }
}
