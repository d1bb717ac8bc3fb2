//! Logging for gridplan runs.
//!
//! Messages go to the terminal, with warnings and errors on stderr and everything else on stdout.
//! When a run has an output folder, messages are also written to log files there so that the
//! advisories raised while composing each subproblem are kept alongside its results.
//!
//! The log level is taken from the `GRIDPLAN_LOG_LEVEL` environment variable, then from
//! `settings.toml`, then [`DEFAULT_LOG_LEVEL`]. At `debug` level the solver's own output is shown
//! as well.
use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used if neither the environment nor the settings file give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVEL_ENV_VAR: &str = "GRIDPLAN_LOG_LEVEL";

/// Log file for progress messages
const INFO_LOG_FILE_NAME: &str = "gridplan_info.log";

/// Log file for warnings, including validation advisories, and errors
const ERROR_LOG_FILE_NAME: &str = "gridplan_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings` - The log level given in `settings.toml`, if any
/// * `output_path` - The run's output folder, in which log files are created
pub fn init(log_level_from_settings: Option<&str>, output_path: Option<&Path>) -> Result<()> {
    let level = log_level(env::var(LOG_LEVEL_ENV_VAR).ok().as_deref(), log_level_from_settings)?;

    let mut dispatch = Dispatch::new()
        .chain(
            terminal(std::io::stdout().is_terminal())
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .level(level)
                .chain(std::io::stdout()),
        )
        .chain(
            terminal(std::io::stderr().is_terminal())
                .level(level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(output_path) = output_path {
        dispatch = dispatch
            .chain(
                log_file(output_path, INFO_LOG_FILE_NAME)?
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .level(level.max(LevelFilter::Info)),
            )
            .chain(log_file(output_path, ERROR_LOG_FILE_NAME)?.level(LevelFilter::Warn));
    }

    dispatch
        .apply()
        .context("Logger has already been initialised")?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// Resolve the log level, with the environment taking precedence over settings
fn log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let level = from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL);
    level
        .parse::<LevelFilter>()
        .ok()
        .with_context(|| format!("Unknown log level: {level}"))
}

/// Log to a terminal stream, colouring levels if it is attached to a terminal
fn terminal(use_colour: bool) -> Dispatch {
    let colours = use_colour.then(|| {
        ColoredLevelConfig::new()
            .error(Color::Red)
            .warn(Color::Yellow)
            .info(Color::Green)
            .debug(Color::Blue)
            .trace(Color::Magenta)
    });
    Dispatch::new().format(move |out, message, record| {
        write_record(out, message, record, colours.as_ref());
    })
}

/// Log to a file in the output folder, replacing any log from a previous run
fn log_file(output_path: &Path, file_name: &str) -> Result<Dispatch> {
    let path = output_path.join(file_name);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("Could not create log file {}", path.display()))?;

    Ok(Dispatch::new()
        .format(|out, message, record| write_record(out, message, record, None))
        .chain(file))
}

/// The module a record came from, without the crate name
fn short_target<'a>(record: &Record<'a>) -> &'a str {
    let target = record.target();
    target.strip_prefix("gridplan::").unwrap_or(target)
}

fn write_record(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = short_target(record);
    match colours {
        Some(colours) => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            colours.color(record.level())
        )),
        None => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            record.level()
        )),
    }
}
