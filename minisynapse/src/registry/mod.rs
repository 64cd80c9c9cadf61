//! The sequence registry.
//!
//! Holds the currently published set of sequences. A refresh reads every
//! definition, builds a complete new set off to the side and only then
//! swaps it in, so lookups see either the old set or the new one.

mod definition;
mod factory;
mod source;
mod xml;

pub use definition::{
    DefinitionFormat, FilterDefinition, LogDefinition, MediatorDefinition, SendDefinition,
    SequenceDefinition,
};
pub use factory::MediatorFactory;
pub use source::{DefinitionSource, DirectorySource, SourceDocument, StaticSource};
pub use xml::MAX_FILTER_DEPTH;

use crate::config::EngineConfig;
use crate::context::MessageContext;
use crate::errors::{ConfigError, NotFoundError, SynapseError};
use crate::sequence::Sequence;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One published set of sequences.
#[derive(Debug, Default)]
struct Generation {
    number: u64,
    sequences: HashMap<String, Arc<Sequence>>,
}

/// Named sequences, refreshed atomically from a [`DefinitionSource`].
///
/// Starts empty at generation 0; call [`refresh`](Self::refresh) to load.
#[derive(Debug)]
pub struct SequenceRegistry {
    source: Box<dyn DefinitionSource>,
    factory: MediatorFactory,
    current: RwLock<Arc<Generation>>,
    refresh_lock: Mutex<()>,
}

impl SequenceRegistry {
    /// Creates an empty registry over `source`.
    #[must_use]
    pub fn new(source: impl DefinitionSource + 'static, factory: MediatorFactory) -> Self {
        Self {
            source: Box::new(source),
            factory,
            current: RwLock::new(Arc::new(Generation::default())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Creates an empty registry reading `config.config_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn from_config(config: &EngineConfig) -> Result<Self, reqwest::Error> {
        let factory = MediatorFactory::from_send_config(&config.send)?;
        Ok(Self::new(DirectorySource::new(&config.config_dir), factory))
    }

    /// Reloads every definition and publishes the result.
    ///
    /// All or nothing: on any error the previously published sequences stay
    /// in place. Returns the new generation number.
    ///
    /// Blocking: reads the source synchronously. Concurrent calls are
    /// serialized.
    pub fn refresh(&self) -> Result<u64, ConfigError> {
        let _guard = self.refresh_lock.lock();

        let sequences = match self.build() {
            Ok(sequences) => sequences,
            Err(e) => {
                warn!(
                    source = %e.source_id,
                    error = %e.message,
                    generation = self.generation(),
                    "refresh rejected; keeping current sequences"
                );
                return Err(e);
            }
        };

        let number = self.generation() + 1;
        let count = sequences.len();
        *self.current.write() = Arc::new(Generation { number, sequences });

        info!(generation = number, sequences = count, "sequences published");
        Ok(number)
    }

    fn build(&self) -> Result<HashMap<String, Arc<Sequence>>, ConfigError> {
        let mut sequences: HashMap<String, Arc<Sequence>> = HashMap::new();
        let mut origins: HashMap<String, String> = HashMap::new();

        for doc in self.source.load()? {
            let sequence = self.factory.build_document(&doc)?;
            let name = sequence.name().to_string();
            if let Some(first) = origins.get(&name) {
                return Err(ConfigError::new(
                    &doc.id,
                    format!("duplicate sequence name '{name}' (already defined in '{first}')"),
                )
                .with_sequence(name));
            }
            origins.insert(name.clone(), doc.id);
            sequences.insert(name, Arc::new(sequence));
        }
        Ok(sequences)
    }

    /// Looks up a sequence in the current generation.
    ///
    /// The returned handle stays valid after later refreshes.
    pub fn get(&self, name: &str) -> Result<Arc<Sequence>, NotFoundError> {
        self.current
            .read()
            .sequences
            .get(name)
            .cloned()
            .ok_or_else(|| NotFoundError::new(name))
    }

    /// Looks up `name` and runs it against `ctx`.
    ///
    /// Fails with [`SynapseError::NotFound`] before touching the context, or
    /// with [`SynapseError::Mediation`] when the run aborts.
    pub async fn dispatch(&self, name: &str, ctx: &mut MessageContext) -> Result<(), SynapseError> {
        let sequence = self.get(name)?;
        sequence.process(ctx).await?;
        Ok(())
    }

    /// Names of the published sequences, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.current.read().sequences.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of successful refreshes so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.read().number
    }

    /// Number of published sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.read().sequences.len()
    }

    /// Returns true if no sequences are published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().sequences.is_empty()
    }
}
