//! Logging for the selection and signing engine
//!
//! A thin layer over the `log` facade with an `env_logger` backend:
//! - One-time initialization from a [`LogConfig`]
//! - Human-readable or JSON-lines output
//! - Context helpers that sanitize parameters before they are written
//!
//! # Security Considerations
//!
//! - Private keys are never passed to any logging function
//! - Outpoints and transaction ids are truncated through
//!   [`sanitize_for_logging`] when they go through the context helpers
//!
//! # Usage
//!
//! ```
//! use coinsmith_common::logging::{self, LogConfig, LogLevel};
//! use serde_json::json;
//!
//! logging::init(&LogConfig::default()).expect("Failed to initialize logging");
//!
//! logging::log_selection(
//!     LogLevel::Info,
//!     "selection_started",
//!     Some(json!({ "strategy": "largest_first" })),
//! );
//! ```

use bitcoin::OutPoint;
use chrono::Local;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write as IoWrite;
use std::sync::{Mutex, Once};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error conditions
    Error,
    /// Warning conditions
    Warn,
    /// Informational messages
    Info,
    /// Debug-level messages
    Debug,
    /// Trace level (very verbose)
    Trace,
}

/// Log context categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogContext {
    /// Coin selection
    Selection,
    /// Fee computation and change handling
    Finalization,
    /// Signature production and verification
    Signing,
    /// Configuration loading and validation
    Config,
}

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level
    pub level: LogLevel,
    /// Path to log file (None for stderr)
    pub log_file: Option<String>,
    /// Whether to include timestamps in log messages
    pub include_timestamps: bool,
    /// Whether to include source location in log messages
    pub include_source_location: bool,
    /// Whether to use JSON format for logs (machine-readable)
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_file: None,
            include_timestamps: true,
            include_source_location: false,
            json_format: false,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

static LOGGING_INIT: Once = Once::new();
static INIT_ERROR: Mutex<Option<String>> = Mutex::new(None);

/// Initialize the logging system with the given configuration
///
/// Only the first call configures the logger. Later calls return the outcome
/// of that first call. A logger installed by someone else (a test harness,
/// for instance) is accepted as-is.
///
/// # Arguments
/// * `config` - Configuration for the logging system
///
/// # Returns
/// * Result with () on success, error string on failure
pub fn init(config: &LogConfig) -> Result<(), String> {
    let config = config.clone();

    LOGGING_INIT.call_once(|| {
        if let Err(e) = install(config) {
            if let Ok(mut slot) = INIT_ERROR.lock() {
                *slot = Some(e);
            }
        }
    });

    match INIT_ERROR.lock() {
        Ok(slot) => match slot.as_ref() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        },
        Err(_) => Err("Logging initialization state is poisoned".to_string()),
    }
}

fn install(config: LogConfig) -> Result<(), String> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level.into());

    let LogConfig {
        include_timestamps,
        include_source_location,
        json_format,
        log_file,
        ..
    } = config;

    builder.format(move |buf, record| {
        let timestamp = if include_timestamps {
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        } else {
            String::new()
        };

        let source_location = if include_source_location {
            format!(
                " [{}:{}]",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0)
            )
        } else {
            String::new()
        };

        if json_format {
            let line = json!({
                "timestamp": timestamp,
                "level": record.level().to_string(),
                "target": record.target(),
                "location": source_location.trim(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        } else {
            if include_timestamps {
                write!(buf, "{} ", timestamp)?;
            }
            let mut style = buf.style();
            style.set_bold(true);
            writeln!(
                buf,
                "[{}{}] {}",
                style.value(record.level()),
                source_location,
                record.args()
            )
        }
    });

    if let Some(file_path) = &log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .map_err(|e| format!("Failed to open log file {}: {}", file_path, e))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    match builder.try_init() {
        Ok(()) => Ok(()),
        // Another logger is already installed; keep it
        Err(e) if e.to_string().contains("already") => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Update the log level dynamically
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.into());
}

/// Sanitize a potentially sensitive string for logging
///
/// Keeps the first and last four characters of longer values and masks
/// short ones entirely.
pub fn sanitize_for_logging(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= 8 {
        return "*****".to_string();
    }

    let first: String = chars[..4].iter().collect();
    let last: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", first, last)
}

/// Sanitize an outpoint as `abcd...wxyz:vout`
pub fn sanitize_outpoint(outpoint: &OutPoint) -> String {
    format!(
        "{}:{}",
        sanitize_for_logging(&outpoint.txid.to_string()),
        outpoint.vout
    )
}

fn log_with_context(
    level: LogLevel,
    context: LogContext,
    message: &str,
    params: Option<serde_json::Value>,
) {
    match params {
        Some(params) => log::log!(level.into(), "[{:?}] {} - {}", context, message, params),
        None => log::log!(level.into(), "[{:?}] {}", context, message),
    }
}

/// Log a coin selection event
pub fn log_selection(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Selection, message, params);
}

/// Log a finalization event (fee, change, dust decisions)
pub fn log_transaction(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Finalization, message, params);
}

/// Log a signing event
///
/// Never pass key material; input indices and script kinds only.
pub fn log_signing(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Signing, message, params);
}

/// Log a configuration event
pub fn log_config(level: LogLevel, message: &str, params: Option<serde_json::Value>) {
    log_with_context(level, LogContext::Config, message, params);
}

/// Build a JSON object from already sanitized `(name, value)` pairs
pub fn log_params(params: Vec<(&str, String)>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in params {
        map.insert(name.to_string(), serde_json::Value::String(value));
    }
    serde_json::Value::Object(map)
}
