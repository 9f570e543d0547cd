//! Logging setup
//!
//! Every executable logs through the `log` facade. [`logger_init`] installs a `fern` dispatcher
//! with two outputs:
//!
//! - the console, with short coloured level tags,
//! - the session log file, uncoloured and with the record's target on every line.
//!
//! Both outputs prefix each line with the seconds elapsed since the session started.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level};
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Cycle summaries are logged at INFO, a minimum level of {0} would hide them")]
    LevelTooQuiet(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    OpenLogFile(std::io::Error),

    #[error("A logger is already installed: {0}")]
    AlreadyInitialised(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the logger for this execution.
///
/// Can only succeed once per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < LevelFilter::Info {
        return Err(LoggerInitError::LevelTooQuiet(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::OpenLogFile)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {} {}",
                elapsed(),
                level_tag(record.level()),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {}: {}",
                elapsed(),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        // The monitor threads are chatty
        .level_for("zmq", LevelFilter::Info)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::AlreadyInitialised)?;

    info!(
        "Logging at {:?} to {:?}, session started {}",
        min_level,
        session.log_file_path,
        session::get_epoch()
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn elapsed() -> String {
    format!("[{:9.3}]", session::get_elapsed_seconds())
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERR".red().bold(),
        Level::Warn => "WRN".yellow(),
        Level::Info => "INF".green(),
        Level::Debug => "DBG".blue(),
        Level::Trace => "TRC".dimmed(),
    }
}
