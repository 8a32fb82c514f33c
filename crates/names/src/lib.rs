//! Filename repair and folder classification.
//!
//! Archives handed to `unravel` have often been through a renaming bug that
//! leaves the archive extension stranded in the middle of the filename
//! (`movie.rar删`, `photos.zip (1).txt`). This crate answers three
//! questions, none of which touch the filesystem:
//!
//! - Is this name a well-formed archive, a mangled one, or neither?
//!   ([`is_archive`], [`is_malformed`], [`NameKind`])
//! - What should a mangled name be called instead, and what is the first
//!   free spelling of that name? ([`correct`], [`Correction::resolve`])
//! - Should a folder be unpacked at all? ([`classify`], [`Verdict`])
//!
//! Suffix matching is ASCII case-insensitive. Because every recognized
//! suffix is pure ASCII, byte offsets found in the folded name are valid
//! `char` boundaries of the original name, so the original spelling (and any
//! non-ASCII text before the suffix) survives correction untouched.

mod classify;
mod correct;
mod suffix;

pub use crate::classify::{DEFAULT_ELIGIBILITY_THRESHOLD, NameKind, Verdict, classify};
pub use crate::correct::{Correction, correct, is_archive, is_malformed};
pub use crate::suffix::{ARCHIVE_SUFFIXES, COMPOUND_SUFFIXES, EXECUTABLE_SUFFIXES, is_executable};
