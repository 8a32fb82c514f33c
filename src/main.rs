//! unravel: repair mangled archive names and unpack nested archives.
//!
//! Usage:
//!   unravel run <DIR>                 Process a folder recursively
//!   unravel passwords list|add|remove Manage stored passwords
//!   unravel history                   Show the most recent runs

mod cli;
mod error;
mod history;
mod render;

use crate::cli::{Cli, Command, PasswordAction, RunArgs};
use crate::error::{ErrorKind, Result};
use crate::history::History;
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;
use unravel_config::{Config, PasswordStore};
use unravel_engine::Engine;
use unravel_extract::{Extractor, Invoker};

/// Conventional exit code for a run interrupted by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    // Must be queried before any other thread exists.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match dispatch(cli, offset) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "Fatal error");
            eprintln!("{:?}", miette::miette!("{err:?}"));
            ExitCode::FAILURE
        },
    }
}

fn dispatch(cli: Cli, offset: UtcOffset) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .or_raise(|| ErrorKind::Run)?;
            runtime.block_on(run(args, config, offset))
        },
        Command::Passwords { action } => {
            let store = match &cli.config {
                Some(path) => PasswordStore::new(path),
                None => PasswordStore::at_default(),
            }
            .or_raise(|| ErrorKind::Config)?;
            passwords(&store, action)?;
            Ok(ExitCode::SUCCESS)
        },
        Command::History => {
            let path = config.history_file().or_raise(|| ErrorKind::Config)?;
            let text = history::read(&path).or_raise(|| ErrorKind::History)?;
            if text.is_empty() {
                tracing::info!(file = %path.display(), "No runs recorded yet");
            } else {
                print!("{text}");
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn passwords(store: &PasswordStore, action: PasswordAction) -> Result<()> {
    match action {
        PasswordAction::List => {
            for password in store.list().or_raise(|| ErrorKind::Config)? {
                println!("{password}");
            }
        },
        PasswordAction::Add { password } => {
            if !store.add(&password).or_raise(|| ErrorKind::Config)? {
                tracing::info!("Password already stored");
            }
        },
        PasswordAction::Remove { password } => {
            if !store.remove(&password).or_raise(|| ErrorKind::Config)? {
                tracing::warn!("Password was not stored");
            }
        },
    }
    Ok(())
}

/// Command line flags win over every configuration layer.
fn apply(args: &RunArgs, config: &mut Config) {
    config.has_password |= args.has_password;
    config.interactive |= args.interactive;
    if let Some(extractor) = &args.extractor {
        config.extractor = Some(extractor.clone());
    }
    for password in &args.passwords {
        if !config.passwords.contains(password) {
            config.passwords.push(password.clone());
        }
    }
}

async fn run(args: RunArgs, mut config: Config, offset: UtcOffset) -> Result<ExitCode> {
    apply(&args, &mut config);
    let extractor = Extractor::locate(config.extractor.as_deref()).or_raise(|| ErrorKind::Extractor)?;
    tracing::debug!(extractor = %extractor.path().display(), "Using extractor");
    let history_file = config.history_file().or_raise(|| ErrorKind::Config)?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = Engine::new(Invoker::new(extractor, config.timings()), tx, config.options());
    let cancel = engine.cancel_flag();
    let root = args.dir;
    let task = tokio::spawn(async move { engine.run(&root).await });

    let mut history = History::new(history_file, config.history.keep_runs, offset);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => {
                    render::render(&record);
                    history.push(&record);
                },
                None => break,
            },
            _ = &mut ctrl_c, if !cancel.is_cancelled() => {
                tracing::warn!("Stopping after the current extraction attempt");
                cancel.cancel();
            },
        }
    }

    if !history.is_empty()
        && let Err(e) = history.save()
    {
        tracing::warn!(file = %history.path().display(), error = %e, "Could not save run history");
    }
    let summary = task.await.or_raise(|| ErrorKind::Run)?.or_raise(|| ErrorKind::Run)?;
    Ok(if summary.is_cancelled() { ExitCode::from(EXIT_CANCELLED) } else { ExitCode::SUCCESS })
}
