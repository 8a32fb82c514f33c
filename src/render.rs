use unravel_engine::{Event, Record};

/// How loudly an event is logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

pub fn level(event: &Event) -> Level {
    match event {
        Event::VisitStarted { .. }
        | Event::NoArchives { .. }
        | Event::RoundStarted { .. }
        | Event::ExtractionStarted { .. }
        | Event::AttemptFinished { .. } => Level::Debug,
        Event::RunStarted { .. }
        | Event::Stopped { .. }
        | Event::Renamed { .. }
        | Event::InteractiveStarted { .. }
        | Event::Extracted { .. }
        | Event::RunFinished { .. } => Level::Info,
        Event::ExtractionFailed { .. }
        | Event::ExtractionError { .. }
        | Event::RoundsExhausted { .. }
        | Event::DirectoryError { .. }
        | Event::Cancelled { .. } => Level::Warn,
    }
}

/// Writes an engine record to the log.
pub fn render(record: &Record) {
    let event = &record.event;
    match level(event) {
        Level::Debug => tracing::debug!(target: "unravel::run", "{event}"),
        Level::Info => tracing::info!(target: "unravel::run", "{event}"),
        Level::Warn => tracing::warn!(target: "unravel::run", "{event}"),
    }
}
