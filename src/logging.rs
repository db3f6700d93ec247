//! Explicitly constructed logging context.
//!
//! Instead of process-wide logger state, a `LogContext` is built once in
//! `main` and passed to every component that wants to report something.
//! It knows three things: an optional log file, a minimum level, and an
//! output format.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Message only.
    Plain,
    /// `[LEVEL] message`.
    Tagged,
}

/// Logging context passed down to each component.
pub struct LogContext {
    min_level: LogLevel,
    format: LogFormat,
    file: Option<Mutex<File>>,
}

impl LogContext {
    /// Create a logging context.
    ///
    /// If `file_path` is given, its parent directory is created and log
    /// lines are appended to the file in addition to the console.
    pub fn new(min_level: LogLevel, format: LogFormat, file_path: Option<&Path>) -> Result<Self> {
        let file = match file_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let f = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?;
                Some(Mutex::new(f))
            }
            None => None,
        };

        Ok(Self {
            min_level,
            format,
            file,
        })
    }

    /// Console-only context that discards everything below `min_level`.
    pub fn console(min_level: LogLevel) -> Self {
        Self {
            min_level,
            format: LogFormat::Tagged,
            file: None,
        }
    }

    fn render(&self, level: LogLevel, msg: &str) -> String {
        match self.format {
            LogFormat::Plain => msg.to_string(),
            LogFormat::Tagged => format!("[{}] {}", level, msg),
        }
    }

    /// Emit a message at the given level.
    ///
    /// Warnings and errors go to stderr, everything else to stdout. The log
    /// file (if any) receives all emitted lines. File write failures are
    /// ignored; logging must never take the build down.
    pub fn log(&self, level: LogLevel, msg: &str) {
        if level < self.min_level {
            return;
        }
        let line = self.render(level, msg);
        match level {
            LogLevel::Warn | LogLevel::Error => eprintln!("{}", line),
            _ => println!("{}", line),
        }
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{}", line);
            }
        }
    }

    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_file_receives_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/build.log");

        let log = LogContext::new(LogLevel::Info, LogFormat::Tagged, Some(&path)).unwrap();
        log.info("hello");
        log.debug("filtered out");
        log.warn("careful");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[INFO] hello"));
        assert!(content.contains("[WARN] careful"));
        assert!(!content.contains("filtered out"));
    }

    #[test]
    fn test_plain_format_has_no_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.log");

        let log = LogContext::new(LogLevel::Debug, LogFormat::Plain, Some(&path)).unwrap();
        log.info("just the message");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "just the message");
    }
}
