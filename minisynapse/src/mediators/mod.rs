//! Mediators: the processing steps a sequence is made of.
//!
//! The set of kinds is closed. A [`Mediator`] is one of:
//!
//! - [`LogMediator`]: writes a line, never fails
//! - [`FilterMediator`]: conditionally runs nested mediators, fails open
//! - [`SendMediator`]: forwards the message and adopts the reply

mod filter;
mod log;
mod send;

pub use filter::FilterMediator;
pub use log::LogMediator;
pub use send::{is_hop_by_hop, SendMediator, HOP_BY_HOP_HEADERS};

use crate::context::MessageContext;
use crate::errors::MediationError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a mediator, as named in sequence definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediatorKind {
    /// `log`
    Log,
    /// `filter`
    Filter,
    /// `send`
    Send,
}

impl fmt::Display for MediatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Log => "log",
            Self::Filter => "filter",
            Self::Send => "send",
        };
        f.write_str(name)
    }
}

/// A single processing step.
#[derive(Debug, Clone)]
pub enum Mediator {
    /// Writes a log line.
    Log(LogMediator),
    /// Runs nested mediators when a predicate holds.
    Filter(FilterMediator),
    /// Forwards the message to a destination.
    Send(SendMediator),
}

impl Mediator {
    /// The kind of this mediator.
    #[must_use]
    pub const fn kind(&self) -> MediatorKind {
        match self {
            Self::Log(_) => MediatorKind::Log,
            Self::Filter(_) => MediatorKind::Filter,
            Self::Send(_) => MediatorKind::Send,
        }
    }

    /// Applies this mediator to `ctx`.
    ///
    /// Boxed because a filter awaits its nested mediators.
    ///
    /// # Errors
    ///
    /// Only a `send` mediator outside any filter can fail.
    pub fn mediate<'a>(
        &'a self,
        ctx: &'a mut MessageContext,
    ) -> BoxFuture<'a, Result<(), MediationError>> {
        match self {
            Self::Log(m) => {
                m.mediate(ctx);
                Box::pin(futures::future::ready(Ok(())))
            }
            Self::Filter(m) => Box::pin(m.mediate(ctx)),
            Self::Send(m) => Box::pin(m.mediate(ctx)),
        }
    }
}

impl From<LogMediator> for Mediator {
    fn from(m: LogMediator) -> Self {
        Self::Log(m)
    }
}

impl From<FilterMediator> for Mediator {
    fn from(m: FilterMediator) -> Self {
        Self::Filter(m)
    }
}

impl From<SendMediator> for Mediator {
    fn from(m: SendMediator) -> Self {
        Self::Send(m)
    }
}
