//! The `filter` mediator.

use super::Mediator;
use crate::context::MessageContext;
use crate::errors::MediationError;
use crate::expression::Predicate;
use tracing::{debug, error};

/// Runs its nested mediators only when a predicate holds.
///
/// The filter fails open: a predicate that cannot be evaluated, or a nested
/// mediator that fails, is logged at ERROR and treated as "condition false".
/// Whatever the nested mediators already did to the context stays, and the
/// enclosing sequence carries on with the next mediator.
#[derive(Debug, Clone)]
pub struct FilterMediator {
    predicate: Predicate,
    nested: Vec<Mediator>,
}

impl FilterMediator {
    /// Creates a filter.
    #[must_use]
    pub fn new(predicate: Predicate, nested: Vec<Mediator>) -> Self {
        Self { predicate, nested }
    }

    /// The predicate.
    #[must_use]
    pub const fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The nested mediators, in execution order.
    #[must_use]
    pub fn nested(&self) -> &[Mediator] {
        &self.nested
    }

    /// Evaluates the predicate and, when truthy, runs the nested mediators.
    ///
    /// Always returns `Ok`; the `Result` keeps the signature uniform with the
    /// other mediators.
    pub async fn mediate(&self, ctx: &mut MessageContext) -> Result<(), MediationError> {
        if let Err(reason) = self.run(ctx).await {
            error!(
                message_id = %ctx.id(),
                expression = %self.predicate,
                error = %reason,
                "filter failed; skipping nested mediators"
            );
        }
        Ok(())
    }

    async fn run(&self, ctx: &mut MessageContext) -> Result<(), String> {
        let matched = self.predicate.evaluate(ctx).map_err(|e| e.to_string())?;
        debug!(
            message_id = %ctx.id(),
            expression = %self.predicate,
            matched,
            "filter evaluated"
        );
        if !matched {
            return Ok(());
        }

        for mediator in &self.nested {
            mediator.mediate(ctx).await.map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
