//! Configuration for `unravel`.
//!
//! Values are layered, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. The configuration file: `config.json` in the platform configuration
//!    directory, or an explicit path. JSON, TOML and YAML are accepted,
//!    chosen by file extension.
//! 3. Environment variables prefixed `UNRAVEL_`, nested keys separated by
//!    `__` (`UNRAVEL_TIMINGS__SETTLE_MILLIS=500`).
//!
//! Command line flags are applied on top by the binary.

pub mod error;
mod passwords;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use unravel_engine::Options;
use unravel_extract::{Password, PollPolicy, Timings};

pub use crate::passwords::PasswordStore;

const ENV_PREFIX: &str = "UNRAVEL_";
const CONFIG_FILE: &str = "config.json";
const HISTORY_FILE: &str = "recent_logs.txt";

/// Fully merged configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extraction tool to use instead of searching for one.
    pub extractor: Option<PathBuf>,
    pub passwords: Vec<String>,
    pub has_password: bool,
    pub interactive: bool,
    pub max_rounds: usize,
    pub eligibility_threshold: usize,
    pub timings: TimingsConfig,
    pub history: HistoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        let options = Options::default();
        Self {
            extractor: None,
            passwords: Vec::new(),
            has_password: options.has_password,
            interactive: options.interactive,
            max_rounds: options.max_rounds,
            eligibility_threshold: options.eligibility_threshold,
            timings: TimingsConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub extract_timeout_secs: u64,
    pub interactive_timeout_secs: u64,
    pub settle_millis: u64,
    pub poll_attempts: u32,
    pub poll_interval_millis: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        let timings = Timings::default();
        Self {
            extract_timeout_secs: timings.extract_timeout.as_secs(),
            interactive_timeout_secs: timings.interactive_timeout.as_secs(),
            settle_millis: millis(timings.poll.settle),
            poll_attempts: timings.poll.attempts,
            poll_interval_millis: millis(timings.poll.interval),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of most recent runs kept in the history file.
    pub keep_runs: usize,
    /// History file, defaults to `recent_logs.txt` in the data directory.
    pub file: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { keep_runs: 3, file: None }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "unravel")
}

/// `config.json` in the platform configuration directory.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = project_dirs().ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}

/// Builds the layered provider chain. An explicit file must exist; the
/// default one is optional.
pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    let file = match explicit {
        Some(path) if !path.is_file() => exn::bail!(ErrorKind::Missing(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().ok().filter(|p| p.is_file()),
    };
    if let Some(file) = file {
        tracing::debug!(file = %file.display(), "Loading configuration file");
        figment = match extension(&file).as_deref() {
            Some("toml") => figment.merge(Toml::file(&file)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(&file)),
            _ => figment.merge(Json::file(&file)),
        };
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}

impl Config {
    /// Loads and merges every layer.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        figment(explicit)?.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// Engine options for a run.
    pub fn options(&self) -> Options {
        Options {
            passwords: self.passwords.iter().map(|p| Password::new(p.as_str())).collect(),
            has_password: self.has_password,
            interactive: self.interactive,
            max_rounds: self.max_rounds,
            eligibility_threshold: self.eligibility_threshold,
        }
    }

    pub fn timings(&self) -> Timings {
        let t = &self.timings;
        Timings {
            extract_timeout: Duration::from_secs(t.extract_timeout_secs),
            interactive_timeout: Duration::from_secs(t.interactive_timeout_secs),
            poll: PollPolicy {
                settle: Duration::from_millis(t.settle_millis),
                attempts: t.poll_attempts,
                interval: Duration::from_millis(t.poll_interval_millis),
            },
        }
    }

    /// Where the recent-run history is written.
    pub fn history_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.history.file {
            return Ok(file.clone());
        }
        let dirs = project_dirs().ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        Ok(dirs.data_dir().join(HISTORY_FILE))
    }
}
