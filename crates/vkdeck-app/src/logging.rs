use log::LevelFilter;

use crate::error::AppError;

pub const LOG_ENV: &str = "VKDECK_LOG";

pub fn parse_level(value: &str) -> Result<LevelFilter, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "0" => Ok(LevelFilter::Off),
        "error" | "1" => Ok(LevelFilter::Error),
        "warn" | "warning" | "2" => Ok(LevelFilter::Warn),
        "info" | "3" => Ok(LevelFilter::Info),
        "debug" | "4" => Ok(LevelFilter::Debug),
        "trace" | "5" => Ok(LevelFilter::Trace),
        _ => Err(AppError::InvalidLogLevel(value.to_owned())),
    }
}

/// Installs `env_logger` on stderr; stdout belongs to the UI protocol.
/// `$VKDECK_LOG` wins over the configured level.
pub fn init(configured: &str) -> Result<LevelFilter, AppError> {
    let level = match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => parse_level(&value)?,
        _ => parse_level(configured)?,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format_timestamp_micros()
        .try_init()
        .map_err(|_| AppError::LoggerInstalled)?;
    Ok(level)
}
