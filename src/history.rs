use std::io;
use std::path::{Path, PathBuf};
use time::UtcOffset;
use time::macros::format_description;
use unravel_engine::{Record, Tag};

const START: &str = "=== start";
const END: &str = "=== end";

/// Plain-text log of the most recent runs.
///
/// Each run is a block delimited by a `=== start …` and a `=== end …` line.
/// Saving appends the current run and drops the oldest blocks beyond
/// `keep`.
#[derive(Debug)]
pub struct History {
    path: PathBuf,
    keep: usize,
    offset: UtcOffset,
    lines: Vec<String>,
}

impl History {
    pub fn new(path: impl Into<PathBuf>, keep: usize, offset: UtcOffset) -> Self {
        Self { path: path.into(), keep, offset, lines: Vec::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn push(&mut self, record: &Record) {
        let at = record.at.to_offset(self.offset);
        let clock = at
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        if record.tag == Some(Tag::Start) {
            let date = at.format(format_description!("[year]-[month]-[day]")).unwrap_or_default();
            self.lines.push(format!("{START} {date} {clock} ==="));
        }
        self.lines.push(format!("[{clock}] {}", record.event));
        if record.tag == Some(Tag::End) {
            self.lines.push(format!("{END} {clock} ==="));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rewrites the history file with the current run as the newest block.
    pub fn save(&self) -> io::Result<()> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let mut runs = split_runs(&existing);
        runs.push(self.lines.join("\n"));
        let skip = runs.len().saturating_sub(self.keep);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut text = runs[skip..].join("\n\n");
        text.push('\n');
        std::fs::write(&self.path, text)
    }
}

/// Cuts a history file into run blocks. Lines outside any block are dropped.
fn split_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in text.lines() {
        if line.starts_with(START) {
            current = Some(vec![line]);
        } else if let Some(block) = current.as_mut() {
            block.push(line);
            if line.starts_with(END) {
                runs.extend(current.take().map(|b| b.join("\n")));
            }
        }
    }
    // A run that never finished (crash, kill) is still worth keeping.
    runs.extend(current.map(|b| b.join("\n").trim_end().to_string()));
    runs
}

/// Contents of the history file, empty if there is none yet.
pub fn read(path: &Path) -> io::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}
