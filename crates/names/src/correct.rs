use crate::suffix::{BY_LENGTH, find_ignore_case, terminal_suffix};

/// Returns `true` if `name` ends with a recognized archive suffix.
pub fn is_archive(name: &str) -> bool {
    terminal_suffix(name).is_some()
}

/// Returns `true` if `name` contains a recognized archive suffix anywhere
/// other than at its end.
///
/// A name that already ends with a recognized suffix (compound suffixes such
/// as `.tar.gz` included) is never malformed, even if another suffix shows
/// up earlier: `backup.tar.gz` and `notes.zip.rar` are both left alone.
pub fn is_malformed(name: &str) -> bool {
    !is_archive(name) && BY_LENGTH.iter().any(|s| find_ignore_case(name, s).is_some())
}

/// A repaired archive name, split into the text kept from the original
/// filename and the recognized suffix that now terminates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Correction {
    base: String,
    suffix: &'static str,
}

/// Computes the repaired spelling of a malformed archive name.
///
/// Suffixes are tried longest first. The first one found in `name` wins;
/// everything from the end of its first occurrence onwards is dropped and
/// the suffix is re-attached in lower case:
///
/// ```
/// let fixed = unravel_names::correct("movie.RAR删").unwrap();
/// assert_eq!(fixed.name(), "movie.rar");
/// ```
///
/// Returns `None` if the name is not malformed, which makes the operation
/// idempotent: correcting a corrected name yields `None`.
pub fn correct(name: &str) -> Option<Correction> {
    if is_archive(name) {
        return None;
    }
    BY_LENGTH.iter().find_map(|&suffix| {
        find_ignore_case(name, suffix).map(|pos| Correction { base: name[..pos].to_string(), suffix })
    })
}

impl Correction {
    /// The repaired name, before collision resolution.
    pub fn name(&self) -> String {
        format!("{}{}", self.base, self.suffix)
    }

    /// Text preceding the suffix.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Recognized suffix terminating the repaired name.
    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    /// Picks the first spelling of this name that `is_taken` reports as
    /// free: `base.ext`, then `base_1.ext`, `base_2.ext` and so on.
    ///
    /// The split happens on the recognized suffix rather than the last dot,
    /// so a taken `backup.tar.gz` becomes `backup_1.tar.gz`.
    pub fn resolve(&self, mut is_taken: impl FnMut(&str) -> bool) -> String {
        let name = self.name();
        if !is_taken(&name) {
            return name;
        }
        let mut counter: usize = 1;
        loop {
            let candidate = format!("{}_{}{}", self.base, counter, self.suffix);
            if !is_taken(&candidate) {
                tracing::trace!(wanted = %name, resolved = %candidate, "Corrected name collided with an existing entry");
                return candidate;
            }
            counter += 1;
        }
    }
}
