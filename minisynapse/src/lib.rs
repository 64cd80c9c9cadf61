//! # minisynapse
//!
//! A small message-mediation engine.
//!
//! Inbound messages are run through named **sequences**: ordered lists of
//! **mediators** that inspect, log, conditionally route and forward the
//! message, leaving the reply on the message context.
//!
//! - **Mediators**: `log`, `filter` (with a small predicate language) and
//!   `send` (HTTP forwarding)
//! - **Hot reload**: sequences are defined in JSON, YAML, TOML or XML files and
//!   re-read atomically; a broken file never replaces a working set
//! - **Structured logging** through `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use minisynapse::prelude::*;
//!
//! let registry = SequenceRegistry::from_config(&EngineConfig::new("config"))?;
//! registry.refresh()?;
//!
//! let mut ctx = MessageContext::new("GET", "/orders", Headers::new(), Vec::new());
//! registry.get("main")?.process(&mut ctx).await?;
//! let (status, headers, body) = ctx.into_response();
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod errors;
pub mod expression;
pub mod mediators;
pub mod observability;
pub mod registry;
pub mod sequence;
pub mod testing;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, LoggingConfig, SendConfig};
    pub use crate::context::{Headers, MessageContext};
    pub use crate::errors::{
        ConfigError, ExpressionError, MediationError, NotFoundError, SynapseError,
    };
    pub use crate::expression::Predicate;
    pub use crate::mediators::{
        FilterMediator, LogMediator, Mediator, MediatorKind, SendMediator,
    };
    pub use crate::observability::{
        init_logging, CollectingLogSink, LogLevel, LogSink, NoOpLogSink, TracingLogSink,
    };
    pub use crate::registry::{
        DefinitionSource, DirectorySource, MediatorFactory, SequenceRegistry, StaticSource,
    };
    pub use crate::sequence::Sequence;
}
