//! The `log` mediator.

use crate::context::MessageContext;
use crate::observability::{LogLevel, LogRecord, LogSink, TracingLogSink};
use std::sync::Arc;

/// Writes one line per message to a [`LogSink`].
///
/// Never mutates the context and never fails: sink errors are reported on
/// the engine's own log and otherwise ignored.
#[derive(Debug, Clone)]
pub struct LogMediator {
    level: LogLevel,
    message: Option<String>,
    sink: Arc<dyn LogSink>,
}

impl LogMediator {
    /// Creates a log mediator writing to the `tracing` sink.
    #[must_use]
    pub fn new(level: LogLevel, message: Option<String>) -> Self {
        Self::with_sink(level, message, Arc::new(TracingLogSink))
    }

    /// Creates a log mediator writing to a specific sink.
    #[must_use]
    pub fn with_sink(level: LogLevel, message: Option<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            level,
            // An empty message behaves like no message.
            message: message.filter(|m| !m.is_empty()),
            sink,
        }
    }

    /// The configured severity.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// The configured fixed message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The line this mediator would write for `ctx`.
    #[must_use]
    pub fn render(&self, ctx: &MessageContext) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{} {}", ctx.method(), ctx.path()))
    }

    /// Writes the line for `ctx`.
    pub fn mediate(&self, ctx: &MessageContext) {
        let message = self.render(ctx);
        let record = LogRecord {
            level: self.level,
            message: &message,
            message_id: ctx.id(),
        };

        if let Err(e) = self.sink.write(&record) {
            tracing::warn!(
                message_id = %ctx.id(),
                error = %e,
                "log mediator could not write to its sink"
            );
        }
    }
}
