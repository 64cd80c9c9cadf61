//! Log sinks for the `log` mediator.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Severity of a log mediator, ordered `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// A failure.
    Error,
}

impl LogLevel {
    /// Parses a level name, falling back to `Info` for unknown names.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One line emitted by a `log` mediator.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub message: &'a str,
    /// The message being mediated.
    pub message_id: Uuid,
}

/// Destination for `log` mediator output.
///
/// A sink may fail (e.g. a full disk); the `log` mediator swallows the error
/// so logging never aborts a run.
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the record could not be written.
    fn write(&self, record: &LogRecord<'_>) -> std::io::Result<()>;
}

/// A sink that forwards to the process-wide `tracing` subscriber.
///
/// This is the default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, record: &LogRecord<'_>) -> std::io::Result<()> {
        match record.level {
            LogLevel::Debug => tracing::debug!(
                target: "minisynapse::log",
                message_id = %record.message_id,
                "{}", record.message
            ),
            LogLevel::Info => tracing::info!(
                target: "minisynapse::log",
                message_id = %record.message_id,
                "{}", record.message
            ),
            LogLevel::Warn => tracing::warn!(
                target: "minisynapse::log",
                message_id = %record.message_id,
                "{}", record.message
            ),
            LogLevel::Error => tracing::error!(
                target: "minisynapse::log",
                message_id = %record.message_id,
                "{}", record.message
            ),
        }
        Ok(())
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogSink;

impl LogSink for NoOpLogSink {
    fn write(&self, _record: &LogRecord<'_>) -> std::io::Result<()> {
        Ok(())
    }
}

/// A sink that keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingLogSink {
    records: RwLock<Vec<(LogLevel, String)>>,
}

impl CollectingLogSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records.
    #[must_use]
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.read().clone()
    }

    /// Returns only the messages, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records.read().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clears all collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl LogSink for CollectingLogSink {
    fn write(&self, record: &LogRecord<'_>) -> std::io::Result<()> {
        self.records
            .write()
            .push((record.level, record.message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: LogLevel, message: &str) -> LogRecord<'_> {
        LogRecord {
            level,
            message,
            message_id: Uuid::nil(),
        }
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("TRACE".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Info);
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_level_serde() {
        let level: LogLevel = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(serde_json::to_string(&LogLevel::Debug).unwrap(), "\"DEBUG\"");
    }

    #[test]
    fn test_tracing_and_noop_sinks_never_fail() {
        assert!(TracingLogSink.write(&record(LogLevel::Error, "boom")).is_ok());
        assert!(NoOpLogSink.write(&record(LogLevel::Info, "quiet")).is_ok());
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingLogSink::new();
        assert!(sink.is_empty());

        sink.write(&record(LogLevel::Info, "first")).unwrap();
        sink.write(&record(LogLevel::Warn, "second")).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.messages(), vec!["first", "second"]);
        assert_eq!(sink.records()[1].0, LogLevel::Warn);

        sink.clear();
        assert!(sink.is_empty());
    }
}
