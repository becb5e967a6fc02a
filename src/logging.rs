// src/logging.rs
use log::{LevelFilter, SetLoggerError};
use std::path::Path;

// Chatty dependencies only get to report problems.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "zbus"];

/// Logs to `path`, for when the dashboard owns the terminal.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level);
    for target in QUIET_TARGETS {
        dispatch = dispatch.level_for(*target, LevelFilter::Warn);
    }
    dispatch.chain(fern::log_file(path)?).apply()?;
    Ok(())
}

/// Logs to stderr. `RUST_LOG` overrides `level`.
pub fn init_console_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    for target in QUIET_TARGETS {
        builder.filter_module(target, LevelFilter::Warn);
    }
    builder.parse_default_env().format_timestamp_secs().try_init()
}
