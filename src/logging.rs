// Logging backend for evdispatch
// A `log::Log` implementation for applications embedding the dispatcher
//
// The dispatcher itself only talks to the `log` facade: registry changes at
// debug, per-listener invocations at trace, ignored event arguments at warn.
// This module gives hosts a ready-made sink for those records:
// - Text or JSON lines
// - Console (stderr), file, or both, each with its own level
// - Local timestamps (YYYY-MM-DD HH:mm:ss) and the emitting module as target
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Warn,
//     file_level: Some(LevelFilter::Trace),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("dispatch.log")),
// };
// init_logger(config)?;
// ```

use log::{Level, LevelFilter, Record};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{Context, Result};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path.as_path()),
        }
    }

    fn console(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// One JSON log line
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Warn,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        let console = if self.destination.console() {
            self.console_level
        } else {
            LevelFilter::Off
        };
        match (self.destination.file(), self.file_level) {
            (Some(_), Some(file_level)) => console.max(file_level),
            _ => console,
        }
    }
}

/// `log::Log` sink writing dispatcher records to stderr and/or a file
pub struct DispatchLogger {
    config: LogConfig,
}

impl DispatchLogger {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text(&self, level: Level, target: &str, message: &str) -> String {
        format!(
            "{} [{}] {}: {}",
            Self::format_timestamp(),
            level.as_str(),
            target,
            message
        )
    }

    fn format_json(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.as_str().to_string(),
            target: target.to_string(),
            message: message.to_string(),
        };

        serde_json::to_string(&entry).context("Failed to serialize log entry to JSON")
    }

    fn format_record(&self, record: &Record) -> String {
        let message = record.args().to_string();
        let (level, target) = (record.level(), record.target());

        match self.config.format {
            LogFormat::Text => self.format_text(level, target, &message),
            LogFormat::Json => self.format_json(level, target, &message).unwrap_or_else(|e| {
                eprintln!("JSON formatting error: {}. Falling back to text format.", e);
                self.format_text(level, target, &message)
            }),
        }
    }

    fn to_console(&self, level: Level) -> bool {
        self.config.destination.console() && level <= self.config.console_level
    }

    fn to_file(&self, level: Level) -> Option<&Path> {
        let file_level = self.config.file_level?;
        self.config.destination.file().filter(|_| level <= file_level)
    }

    fn write_console(&self, line: &str) -> Result<()> {
        writeln!(io::stderr(), "{}", line).context("Failed to write to console")
    }

    fn write_file(&self, line: &str, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        writeln!(file, "{}", line).context("Failed to write to log file")
    }
}

impl log::Log for DispatchLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.to_console(metadata.level()) || self.to_file(metadata.level()).is_some()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format_record(record);
        let level = record.level();

        if let Some(path) = self.to_file(level) {
            if let Err(e) = self.write_file(&line, path) {
                eprintln!("File logging error: {}", e);
                // file-only setups still surface the record somewhere
                if !self.config.destination.console() {
                    let _ = self.write_console(&line);
                }
            }
        }

        if self.to_console(level) {
            if let Err(e) = self.write_console(&line) {
                eprintln!("Console logging error: {}", e);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Install [`DispatchLogger`] as the global logger
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();

    log::set_boxed_logger(Box::new(DispatchLogger::new(config)))
        .context("Failed to set global logger")?;
    log::set_max_level(max_level);

    Ok(())
}

/// Parse a level name (`error`, `warn`, `info`, `debug`, `trace`, `off`)
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level_str.trim()).map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off",
            level_str
        )
    })
}
