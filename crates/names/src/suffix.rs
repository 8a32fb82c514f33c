use std::sync::LazyLock;

/// Single archive suffixes, in declaration order.
pub const ARCHIVE_SUFFIXES: [&str; 7] = [".7z", ".zip", ".rar", ".tar", ".gz", ".bz2", ".xz"];

/// Compound suffixes. A name ending in one of these is well-formed even
/// though its first half (`.tar`) appears before the end.
pub const COMPOUND_SUFFIXES: [&str; 3] = [".tar.gz", ".tar.bz2", ".tar.xz"];

/// Suffixes of files that mark a folder as a finished deliverable.
pub const EXECUTABLE_SUFFIXES: [&str; 6] = [".exe", ".msi", ".bat", ".cmd", ".com", ".scr"];

/// Every recognized archive suffix, longest first. Equal lengths keep
/// declaration order (compounds, then singles).
pub(crate) static BY_LENGTH: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut all: Vec<&'static str> = COMPOUND_SUFFIXES.iter().chain(ARCHIVE_SUFFIXES.iter()).copied().collect();
    // `sort_by` is stable.
    all.sort_by(|a, b| b.len().cmp(&a.len()));
    all
});

pub(crate) fn ends_with_ignore_case(haystack: &str, needle: &str) -> bool {
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    h.len() >= n.len() && h[h.len() - n.len()..].eq_ignore_ascii_case(n)
}

/// Byte offset of the first ASCII case-insensitive occurrence of `needle`.
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    if n.is_empty() || n.len() > h.len() {
        return None;
    }
    h.windows(n.len()).position(|w| w.eq_ignore_ascii_case(n))
}

/// The recognized archive suffix `name` ends with, longest match wins.
pub(crate) fn terminal_suffix(name: &str) -> Option<&'static str> {
    BY_LENGTH.iter().copied().find(|s| ends_with_ignore_case(name, s))
}

/// Returns `true` if `name` ends with an executable-like suffix.
pub fn is_executable(name: &str) -> bool {
    EXECUTABLE_SUFFIXES.iter().any(|s| ends_with_ignore_case(name, s))
}
