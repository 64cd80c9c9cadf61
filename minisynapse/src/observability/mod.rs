//! Logging for the engine and for `log` mediators.

mod sink;
mod tracing;

pub use self::tracing::{init_logging, SpanTimer};
pub use sink::{CollectingLogSink, LogLevel, LogRecord, LogSink, NoOpLogSink, TracingLogSink};
