//! Turns parsed definitions into runnable mediators.

use super::definition::{MediatorDefinition, SequenceDefinition};
use super::source::SourceDocument;
use crate::config::SendConfig;
use crate::errors::ConfigError;
use crate::expression::Predicate;
use crate::mediators::{FilterMediator, LogMediator, Mediator, SendMediator};
use crate::observability::{LogLevel, LogSink, TracingLogSink};
use crate::sequence::Sequence;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

/// Shared dependencies injected into every mediator built from definitions.
#[derive(Debug, Clone)]
pub struct MediatorFactory {
    log_sink: Arc<dyn LogSink>,
    client: Client,
    send_timeout: Duration,
}

impl MediatorFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(log_sink: Arc<dyn LogSink>, client: Client, send_timeout: Duration) -> Self {
        Self {
            log_sink,
            client,
            send_timeout,
        }
    }

    /// Creates a factory logging through `tracing` with a client built from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_send_config(config: &SendConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            Arc::new(TracingLogSink),
            config.build_client()?,
            config.timeout(),
        ))
    }

    /// Replaces the log sink.
    #[must_use]
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    /// Parses and builds the sequence held by `doc`.
    pub fn build_document(&self, doc: &SourceDocument) -> Result<Sequence, ConfigError> {
        let definition = SequenceDefinition::parse(&doc.raw, doc.format, &doc.id)?;
        self.build_sequence(&definition, doc)
    }

    fn build_sequence(
        &self,
        definition: &SequenceDefinition,
        doc: &SourceDocument,
    ) -> Result<Sequence, ConfigError> {
        let name = definition
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| doc.default_name.clone());
        if name.is_empty() {
            return Err(ConfigError::new(&doc.id, "sequence has no name"));
        }

        let mediators = self
            .build_all(&definition.mediators, &doc.id)
            .map_err(|e| e.with_sequence(&name))?;
        Ok(Sequence::new(name, mediators))
    }

    fn build_all(
        &self,
        definitions: &[MediatorDefinition],
        source_id: &str,
    ) -> Result<Vec<Mediator>, ConfigError> {
        definitions
            .iter()
            .map(|d| self.build(d, source_id))
            .collect()
    }

    fn build(&self, definition: &MediatorDefinition, source_id: &str) -> Result<Mediator, ConfigError> {
        match definition {
            MediatorDefinition::Log(log) => {
                let level = log
                    .level
                    .as_deref()
                    .map_or(LogLevel::Info, LogLevel::parse_lenient);
                Ok(LogMediator::with_sink(level, log.message.clone(), self.log_sink.clone()).into())
            }
            MediatorDefinition::Filter(filter) => {
                let predicate = Predicate::parse(filter.expr.as_str())
                    .map_err(|e| ConfigError::new(source_id, e.to_string()))?;
                let nested = self.build_all(&filter.mediators, source_id)?;
                Ok(FilterMediator::new(predicate, nested).into())
            }
            MediatorDefinition::Send(send) => {
                let url = parse_destination(&send.url)
                    .map_err(|reason| ConfigError::new(source_id, reason))?;
                Ok(SendMediator::new(url, self.client.clone(), self.send_timeout).into())
            }
        }
    }
}

/// Accepts only absolute `http`/`https` URLs with a host.
fn parse_destination(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| format!("send destination '{raw}' is not an absolute URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "send destination '{raw}' must use http or https, not '{}'",
            url.scheme()
        ));
    }
    if url.host_str().is_none() {
        return Err(format!("send destination '{raw}' has no host"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediators::MediatorKind;
    use crate::observability::NoOpLogSink;
    use crate::registry::DefinitionFormat;

    fn factory() -> MediatorFactory {
        MediatorFactory::new(Arc::new(NoOpLogSink), Client::new(), Duration::from_secs(1))
    }

    fn doc(name: &str, raw: &str) -> SourceDocument {
        SourceDocument {
            id: format!("{name}.json"),
            default_name: name.to_string(),
            format: DefinitionFormat::Json,
            raw: raw.to_string(),
        }
    }

    #[test]
    fn test_builds_nested_structure() {
        let sequence = factory()
            .build_document(&doc(
                "proxy",
                r#"{"mediators": [
                    {"log": {"level": "debug"}},
                    {"filter": {"expr": "ctx.path == '/a'", "mediators": [
                        {"send": {"url": "https://upstream.test/a"}}
                    ]}}
                ]}"#,
            ))
            .unwrap();

        assert_eq!(sequence.name(), "proxy");
        let kinds: Vec<_> = sequence.mediators().iter().map(Mediator::kind).collect();
        assert_eq!(kinds, vec![MediatorKind::Log, MediatorKind::Filter]);

        let Mediator::Filter(filter) = &sequence.mediators()[1] else {
            panic!("expected a filter");
        };
        assert_eq!(filter.predicate().source(), "ctx.path == '/a'");
        let Mediator::Send(send) = &filter.nested()[0] else {
            panic!("expected a send");
        };
        assert_eq!(send.url().as_str(), "https://upstream.test/a");
        assert_eq!(send.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_explicit_name_wins_over_file_stem() {
        let sequence = factory()
            .build_document(&doc("file", r#"{"name": "main", "mediators": []}"#))
            .unwrap();
        assert_eq!(sequence.name(), "main");
        assert!(sequence.is_empty());
    }

    #[test]
    fn test_unknown_level_logs_at_info() {
        let sequence = factory()
            .build_document(&doc("s", r#"{"mediators": [{"log": {"level": "chatty"}}]}"#))
            .unwrap();
        let Mediator::Log(log) = &sequence.mediators()[0] else {
            panic!("expected a log");
        };
        assert_eq!(log.level(), LogLevel::Info);
    }

    #[test]
    fn test_predicate_syntax_error_is_config_error() {
        let err = factory()
            .build_document(&doc(
                "s",
                r#"{"mediators": [{"filter": {"expr": "ctx.method ==", "mediators": []}}]}"#,
            ))
            .unwrap_err();
        assert_eq!(err.source_id, "s.json");
        assert_eq!(err.sequence.as_deref(), Some("s"));
    }

    #[test]
    fn test_relative_send_url_is_config_error() {
        let err = factory()
            .build_document(&doc("s", r#"{"mediators": [{"send": {"url": "/echo"}}]}"#))
            .unwrap_err();
        assert!(err.message.contains("/echo"));
    }

    #[test]
    fn test_parse_destination() {
        assert!(parse_destination("http://127.0.0.1:8081/echo").is_ok());
        assert!(parse_destination("ftp://files.test/").is_err());
        assert!(parse_destination("upstream/echo").is_err());
        assert!(parse_destination("").is_err());
    }
}
