//! Recursive unpacking of a folder tree.
//!
//! Each folder is visited once. A visit repairs mangled archive names and
//! extracts archives into the folder itself, round after round, until a
//! round makes no progress; then every subfolder (including those that
//! extraction just created) is visited in turn. Folders holding an
//! executable are considered finished and left alone entirely.
//!
//! Progress is reported as [`Record`]s through a [`Reporter`]; the engine
//! itself never prints anything.

pub mod error;
mod events;
mod options;
mod summary;
mod traversal;

pub use crate::events::{Event, Record, Recorder, Reporter, Tag};
pub use crate::options::{DEFAULT_MAX_ROUNDS, Options};
pub use crate::summary::{Outcome, Summary};
pub use crate::traversal::Engine;
pub use unravel_extract::CancelFlag;
