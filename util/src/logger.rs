//! # Logger
//!
//! Log lines are written to the terminal, coloured by level, and to the
//! session's log file without any colour codes. Every line starts with the
//! time since the session epoch, and all but `INFO` lines name the module
//! they came from, minus the crate name.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("INFO messages must be logged, minimum level `{0}` would hide them")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger is already set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must let `INFO` messages through. Only one logger may be set
/// per process, a second call fails.
pub fn logger_init(min_level: LevelFilter, session: &session::Session) -> Result<(), LoggerInitError> {
    check_min_level(min_level)?;

    let log_file = fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let terminal = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {}",
                line_prefix(session::get_elapsed_seconds(), record.level(), record.target(), true),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {}",
                line_prefix(session::get_elapsed_seconds(), record.level(), record.target(), false),
                message
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!(
        "Logging at {:?} and above since {} into {:?}",
        min_level,
        session::get_epoch(),
        session.log_file_path
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_min_level(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        Err(LoggerInitError::InvalidMinLogLevel(min_level))
    } else {
        Ok(())
    }
}

/// Build the start of a log line, up to the message.
fn line_prefix(elapsed_s: f64, level: Level, target: &str, coloured: bool) -> String {
    let tag = if coloured {
        coloured_tag(level).to_string()
    } else {
        level_tag(level).to_string()
    };

    match level {
        Level::Info => format!("[{:10.6} {}]", elapsed_s, tag),
        _ => format!("[{:10.6} {}] {}:", elapsed_s, tag, short_target(target)),
    }
}

/// The module path of a target without its crate, so `ctrl_lib::tasks`
/// becomes `tasks`.
fn short_target(target: &str) -> &str {
    match target.find("::") {
        Some(i) => &target[i + 2..],
        None => target,
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn coloured_tag(level: Level) -> ColoredString {
    let tag = level_tag(level);

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_min_level() {
        assert!(check_min_level(LevelFilter::Trace).is_ok());
        assert!(check_min_level(LevelFilter::Info).is_ok());
        assert!(matches!(
            check_min_level(LevelFilter::Warn),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Warn))
        ));
        assert!(check_min_level(LevelFilter::Off).is_err());
    }

    #[test]
    fn test_line_prefix() {
        assert_eq!(line_prefix(1.5, Level::Info, "ctrl_lib::tasks", false), "[  1.500000 INF]");
        assert_eq!(
            line_prefix(12.25, Level::Warn, "ctrl_lib::traj_ctrl::state", false),
            "[ 12.250000 WRN] traj_ctrl::state:"
        );
        assert_eq!(line_prefix(0.0, Level::Debug, "ctrl_exec", false), "[  0.000000 DBG] ctrl_exec:");
    }
}
