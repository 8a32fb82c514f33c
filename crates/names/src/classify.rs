use crate::correct::{is_archive, is_malformed};
use crate::suffix::is_executable;

/// Default maximum number of regular files a folder may hold for a
/// well-formed archive inside it to be extracted automatically.
pub const DEFAULT_ELIGIBILITY_THRESHOLD: usize = 2;

/// What a single filename looks like to the traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    /// Ends with a recognized archive suffix.
    Archive,
    /// Contains a recognized archive suffix, but not at the end.
    Malformed,
    /// Ends with an executable-like suffix.
    Executable,
    Other,
}
impl NameKind {
    pub fn of(name: &str) -> Self {
        if is_archive(name) {
            Self::Archive
        } else if is_malformed(name) {
            Self::Malformed
        } else if is_executable(name) {
            Self::Executable
        } else {
            Self::Other
        }
    }
}

/// Classification of one folder listing.
///
/// Computed from the names of regular files only; subdirectories never
/// count towards any of these flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    /// A stop marker is present: the folder is a finished deliverable.
    pub has_executable: bool,
    /// At least one archive, well-formed or malformed, is present.
    pub has_archive: bool,
    /// Number of regular files in the folder.
    pub file_count: usize,
    /// Number of regular files ending with a recognized archive suffix.
    pub archive_count: usize,
    /// Well-formed archives in this folder may be extracted: the folder holds
    /// at most `threshold` files, or exactly one well-formed archive.
    pub eligible_single: bool,
}

/// Classifies a folder from the names of its regular files.
///
/// `threshold` throttles extraction of already well-formed archives to
/// folders that look like "one archive plus maybe a readme". Malformed
/// archives are not subject to it.
pub fn classify<I, S>(file_names: I, threshold: usize) -> Verdict
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut verdict = Verdict::default();
    for name in file_names {
        let name = name.as_ref();
        verdict.file_count += 1;
        if is_executable(name) {
            verdict.has_executable = true;
        }
        if is_archive(name) {
            verdict.archive_count += 1;
            verdict.has_archive = true;
        } else if is_malformed(name) {
            verdict.has_archive = true;
        }
    }
    verdict.eligible_single = verdict.file_count <= threshold || verdict.archive_count == 1;
    verdict
}
