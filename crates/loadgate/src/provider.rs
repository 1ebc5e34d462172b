//! Patch providers and the transformer catalog.
//!
//! A [`PatchProvider`] is the coremod side of the harness: it names the
//! transformer units to install and may contribute exclusions. Names are
//! resolved to instances through a [`TransformerCatalog`].

use crate::chain::ClassTransformer;
use crate::result::{HarnessError, HarnessResult};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Supplies the transformer units a session installs
pub trait PatchProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Receive launch data before transformers are requested
    fn inject_data(&mut self, _data: &HashMap<String, String>) {}

    /// Names of the transformer units to install, in order
    fn transformer_classes(&self) -> Vec<String>;

    /// Extra exclusion prefixes the provider needs
    fn exclusions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Mixin configurations to register after launch data is injected
    fn late_configs(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A provider defined by plain lists
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    name: String,
    transformers: Vec<String>,
    exclusions: Vec<String>,
    late_configs: Vec<String>,
}

impl StaticProvider {
    /// Create a provider with no transformers
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a transformer name
    #[must_use]
    pub fn with_transformer(mut self, name: impl Into<String>) -> Self {
        self.transformers.push(name.into());
        self
    }

    /// Append an exclusion prefix
    #[must_use]
    pub fn with_exclusion(mut self, prefix: impl Into<String>) -> Self {
        self.exclusions.push(prefix.into());
        self
    }

    /// Append a late mixin configuration
    #[must_use]
    pub fn with_late_config(mut self, config: impl Into<String>) -> Self {
        self.late_configs.push(config.into());
        self
    }
}

impl PatchProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn transformer_classes(&self) -> Vec<String> {
        self.transformers.clone()
    }

    fn exclusions(&self) -> Vec<String> {
        self.exclusions.clone()
    }

    fn late_configs(&self) -> Vec<String> {
        self.late_configs.clone()
    }
}

type Factory = dyn Fn() -> HarnessResult<Arc<dyn ClassTransformer>> + Send + Sync;

/// Name-to-constructor table for transformer units
#[derive(Default)]
pub struct TransformerCatalog {
    factories: BTreeMap<String, Box<Factory>>,
}

impl fmt::Debug for TransformerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerCatalog")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformerCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> HarnessResult<Arc<dyn ClassTransformer>> + Send + Sync + 'static,
    {
        let _ = self.factories.insert(name.into(), Box::new(factory));
    }

    /// Builder form of [`TransformerCatalog::register`]
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> HarnessResult<Arc<dyn ClassTransformer>> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Whether a constructor exists for `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the unit registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::TransformerInstantiation`] if no constructor
    /// is registered or the constructor fails.
    pub fn instantiate(&self, name: &str) -> HarnessResult<Arc<dyn ClassTransformer>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HarnessError::TransformerInstantiation {
                name: name.to_string(),
                message: "no transformer registered under this name".to_string(),
            })?;
        factory().map_err(|e| match e {
            e @ HarnessError::TransformerInstantiation { .. } => e,
            other => HarnessError::TransformerInstantiation {
                name: name.to_string(),
                message: other.to_string(),
            },
        })
    }
}
