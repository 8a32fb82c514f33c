use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Repair mangled archive names and unpack nested archives, recursively.
#[derive(Debug, Parser)]
#[command(name = "unravel", version, about)]
pub struct Cli {
    /// Configuration file (JSON, TOML or YAML) instead of the default `config.json`.
    #[arg(long, global = true, env = "UNRAVEL_CONFIG")]
    pub config: Option<PathBuf>,
    /// More output; repeat for even more.
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only report problems.
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a folder and everything below it.
    Run(RunArgs),
    /// Manage the stored password list.
    Passwords {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// Show the log of the most recent runs.
    History,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Folder to process.
    pub dir: PathBuf,
    /// Every archive is password protected: don't try without a password.
    #[arg(long)]
    pub has_password: bool,
    /// Open archives that resist every password in the extractor's window.
    ///
    /// Off by default: a run never waits on a person unless asked to, here or
    /// with `interactive` in the configuration file.
    #[arg(long)]
    pub interactive: bool,
    /// Extraction tool to use instead of searching for one.
    #[arg(long, value_name = "PATH")]
    pub extractor: Option<PathBuf>,
    /// Extra password to try after the stored ones; may be repeated.
    #[arg(long = "password", value_name = "PASSWORD")]
    pub passwords: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum PasswordAction {
    List,
    Add { password: String },
    Remove { password: String },
}

impl Cli {
    /// Default filter directive for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
