//! Error types for the mediation engine.
//!
//! The taxonomy follows the engine's failure policies:
//!
//! - [`ConfigError`] rejects a whole registry refresh.
//! - [`NotFoundError`] is returned by sequence lookups.
//! - [`MediationError`] aborts a sequence run (transport faults from `send`).
//! - [`ExpressionError`] covers filter predicates; parse faults surface as
//!   configuration errors, evaluation faults are swallowed by the filter.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for minisynapse operations.
#[derive(Debug, Error)]
pub enum SynapseError {
    /// A configuration refresh was rejected.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A sequence lookup failed.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// A mediator aborted the run.
    #[error("{0}")]
    Mediation(#[from] MediationError),

    /// A predicate could not be parsed or evaluated.
    #[error("{0}")]
    Expression(#[from] ExpressionError),
}

impl SynapseError {
    /// HTTP status an inbound listener should answer with for this error.
    ///
    /// Upstream failures are a bad gateway; everything else is an internal
    /// error of the engine's configuration.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Mediation(_) => 502,
            Self::Config(_) | Self::NotFound(_) | Self::Expression(_) => 500,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        match self {
            Self::Config(e) => e.to_dict(),
            Self::NotFound(e) => e.to_dict(),
            Self::Mediation(e) => e.to_dict(),
            Self::Expression(e) => e.to_dict(),
        }
    }
}

/// Error raised when a definition source cannot be turned into a sequence.
///
/// Carries the identifier of the offending source (usually a file path) so
/// operators can locate the broken definition.
#[derive(Debug, Clone, Error)]
#[error("Invalid configuration in '{source_id}': {message}")]
pub struct ConfigError {
    /// The source that failed (file path or in-memory identifier).
    pub source_id: String,
    /// What went wrong.
    pub message: String,
    /// Sequence name, when it was known at the time of failure.
    pub sequence: Option<String>,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            message: message.into(),
            sequence: None,
        }
    }

    /// Sets the sequence name involved.
    #[must_use]
    pub fn with_sequence(mut self, name: impl Into<String>) -> Self {
        self.sequence = Some(name.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ConfigError"));
        map.insert("source".to_string(), serde_json::json!(self.source_id));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref name) = self.sequence {
            map.insert("sequence".to_string(), serde_json::json!(name));
        }
        map
    }
}

/// Error raised when no sequence is published under a name.
#[derive(Debug, Clone, Error)]
#[error("Sequence not found: {name}")]
pub struct NotFoundError {
    /// The requested sequence name.
    pub name: String,
}

impl NotFoundError {
    /// Creates a new not-found error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("NotFoundError"));
        map.insert("name".to_string(), serde_json::json!(self.name));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors that abort a sequence run.
#[derive(Debug, Clone, Error)]
pub enum MediationError {
    /// The outbound request failed at the transport level.
    #[error("Transport failure sending to {url}: {reason}")]
    Transport {
        /// The destination address.
        url: String,
        /// Transport error detail.
        reason: String,
    },

    /// The outbound request did not complete within the configured timeout.
    #[error("Timed out after {timeout_seconds}s sending to {url}")]
    Timeout {
        /// The destination address.
        url: String,
        /// The timeout that elapsed.
        timeout_seconds: f64,
    },

    /// The outbound request could not be built from the message context.
    #[error("Invalid outbound request to {url}: {reason}")]
    InvalidRequest {
        /// The destination address.
        url: String,
        /// Why the request was rejected.
        reason: String,
    },
}

impl MediationError {
    /// Creates a transport failure.
    #[must_use]
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout failure.
    #[must_use]
    pub fn timeout(url: impl Into<String>, timeout_seconds: f64) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout_seconds,
        }
    }

    /// Creates an invalid request failure.
    #[must_use]
    pub fn invalid_request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the destination address involved.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url, .. }
            | Self::InvalidRequest { url, .. } => url,
        }
    }

    /// Whether the failure was a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::Transport { url, reason } => {
                map.insert("type".to_string(), serde_json::json!("TransportError"));
                map.insert("url".to_string(), serde_json::json!(url));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::Timeout { url, timeout_seconds } => {
                map.insert("type".to_string(), serde_json::json!("TimeoutError"));
                map.insert("url".to_string(), serde_json::json!(url));
                map.insert("timeout_seconds".to_string(), serde_json::json!(timeout_seconds));
            }
            Self::InvalidRequest { url, reason } => {
                map.insert("type".to_string(), serde_json::json!("InvalidRequestError"));
                map.insert("url".to_string(), serde_json::json!(url));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// The phase in which a predicate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionPhase {
    /// The expression text is not valid.
    Parse,
    /// The expression is valid but could not be evaluated against a message.
    Eval,
}

impl std::fmt::Display for ExpressionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "Parse"),
            Self::Eval => write!(f, "Evaluation"),
        }
    }
}

/// Error raised by the filter predicate language.
#[derive(Debug, Clone, Error)]
#[error("{phase} error in '{expression}': {message}")]
pub struct ExpressionError {
    /// Parse or evaluation.
    pub phase: ExpressionPhase,
    /// The offending expression text.
    pub expression: String,
    /// What went wrong.
    pub message: String,
    /// Byte offset into the expression, for parse errors.
    pub position: Option<usize>,
}

impl ExpressionError {
    /// Creates a parse error at a byte offset.
    #[must_use]
    pub fn parse(expression: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Self {
            phase: ExpressionPhase::Parse,
            expression: expression.into(),
            message: message.into(),
            position: Some(position),
        }
    }

    /// Creates an evaluation error.
    #[must_use]
    pub fn eval(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase: ExpressionPhase::Eval,
            expression: expression.into(),
            message: message.into(),
            position: None,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("ExpressionError"));
        map.insert("phase".to_string(), serde_json::json!(self.phase.to_string()));
        map.insert("expression".to_string(), serde_json::json!(self.expression));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(position) = self.position {
            map.insert("position".to_string(), serde_json::json!(position));
        }
        map
    }
}
