//! Named, ordered lists of mediators.

use crate::context::MessageContext;
use crate::errors::MediationError;
use crate::mediators::Mediator;
use crate::observability::SpanTimer;
use tracing::{debug, warn};

/// A named, ordered list of mediators applied to one message.
///
/// Immutable once built; a registry refresh replaces whole sequences rather
/// than editing them, so a run never observes a half-applied update.
#[derive(Debug, Clone)]
pub struct Sequence {
    name: String,
    mediators: Vec<Mediator>,
}

impl Sequence {
    /// Creates a sequence.
    #[must_use]
    pub fn new(name: impl Into<String>, mediators: Vec<Mediator>) -> Self {
        Self {
            name: name.into(),
            mediators,
        }
    }

    /// The sequence name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The top-level mediators, in execution order.
    #[must_use]
    pub fn mediators(&self) -> &[Mediator] {
        &self.mediators
    }

    /// Number of top-level mediators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mediators.len()
    }

    /// Returns true if the sequence has no mediators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mediators.is_empty()
    }

    /// Runs every mediator in order against `ctx`.
    ///
    /// Stops at the first failing mediator; effects of the mediators before
    /// it remain on the context. An empty sequence leaves the context as it
    /// was.
    pub async fn process(&self, ctx: &mut MessageContext) -> Result<(), MediationError> {
        let timer = SpanTimer::start(self.name.as_str());
        debug!(
            sequence = %self.name,
            message_id = %ctx.id(),
            mediators = self.mediators.len(),
            "sequence started"
        );

        for (index, mediator) in self.mediators.iter().enumerate() {
            if let Err(e) = mediator.mediate(ctx).await {
                warn!(
                    sequence = %self.name,
                    message_id = %ctx.id(),
                    index,
                    kind = %mediator.kind(),
                    error = %e,
                    "sequence aborted"
                );
                return Err(e);
            }
        }

        debug!(
            sequence = %self.name,
            message_id = %ctx.id(),
            status = ctx.response_status(),
            duration_ms = timer.finish(),
            "sequence completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Headers;
    use crate::expression::Predicate;
    use crate::mediators::{FilterMediator, LogMediator, SendMediator};
    use crate::observability::{CollectingLogSink, LogLevel};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn log(sink: &Arc<CollectingLogSink>, message: &str) -> Mediator {
        LogMediator::with_sink(LogLevel::Info, Some(message.to_string()), sink.clone()).into()
    }

    fn unreachable_send() -> Mediator {
        SendMediator::new(
            reqwest::Url::parse("http://127.0.0.1:9/").unwrap(),
            reqwest::Client::new(),
            Duration::from_millis(500),
        )
        .into()
    }

    #[tokio::test]
    async fn test_empty_sequence_leaves_context_unchanged() {
        let sequence = Sequence::new("empty", Vec::new());
        let mut ctx = MessageContext::new("PUT", "/items/1", Headers::new(), b"data".to_vec());

        sequence.process(&mut ctx).await.unwrap();

        assert!(sequence.is_empty());
        assert_eq!(ctx.response_status(), 200);
        assert!(ctx.response_headers().is_empty());
        assert!(ctx.response_body().is_empty());
    }

    #[tokio::test]
    async fn test_mediators_run_in_declaration_order() {
        let sink = Arc::new(CollectingLogSink::new());
        let sequence = Sequence::new(
            "main",
            vec![
                log(&sink, "one"),
                FilterMediator::new(Predicate::parse("True").unwrap(), vec![log(&sink, "two")])
                    .into(),
                log(&sink, "three"),
            ],
        );
        let mut ctx = MessageContext::new("GET", "/", Headers::new(), Vec::new());

        sequence.process(&mut ctx).await.unwrap();

        assert_eq!(sequence.len(), 3);
        assert_eq!(sink.messages(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_top_level_send_failure_aborts() {
        let sink = Arc::new(CollectingLogSink::new());
        let sequence = Sequence::new(
            "broken",
            vec![log(&sink, "before"), unreachable_send(), log(&sink, "after")],
        );
        let mut ctx = MessageContext::new("GET", "/", Headers::new(), Vec::new());

        let err = sequence.process(&mut ctx).await.unwrap_err();

        assert_eq!(err.url(), "http://127.0.0.1:9/");
        assert_eq!(sink.messages(), vec!["before"]);
    }

    #[tokio::test]
    async fn test_send_failure_inside_filter_does_not_abort() {
        let sink = Arc::new(CollectingLogSink::new());
        let sequence = Sequence::new(
            "guarded",
            vec![
                FilterMediator::new(Predicate::parse("True").unwrap(), vec![unreachable_send()])
                    .into(),
                log(&sink, "after"),
            ],
        );
        let mut ctx = MessageContext::new("GET", "/", Headers::new(), Vec::new());

        sequence.process(&mut ctx).await.unwrap();

        assert_eq!(sink.messages(), vec!["after"]);
        assert_eq!(ctx.response_status(), 200);
    }
}
