//! Ordered transformer chain.
//!
//! Units run in registration order, each receiving the previous unit's
//! output. The first failure stops the chain.

use crate::result::{HarnessError, HarnessResult, TransformFailure};
use std::fmt;
use std::sync::{Arc, RwLock};

/// A single class transformation unit.
///
/// `name` is the internal name the class is loaded under;
/// `transformed_name` is its remapped (readable) name, equal to `name`
/// when no mapping exists.
pub trait ClassTransformer: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Rewrite the class bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformFailure`] if the class cannot be processed.
    fn transform(
        &self,
        name: &str,
        transformed_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<u8>, TransformFailure>;
}

type TransformFn =
    dyn Fn(&str, &str, Vec<u8>) -> Result<Vec<u8>, TransformFailure> + Send + Sync;

/// A transformer built from a closure.
pub struct FnTransformer {
    name: String,
    func: Box<TransformFn>,
}

impl fmt::Debug for FnTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformer")
            .field("name", &self.name)
            .finish()
    }
}

impl FnTransformer {
    /// Create a transformer from a closure
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &str, Vec<u8>) -> Result<Vec<u8>, TransformFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl ClassTransformer for FnTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(
        &self,
        name: &str,
        transformed_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<u8>, TransformFailure> {
        (self.func)(name, transformed_name, bytes)
    }
}

/// Ordered sequence of transformer units.
#[derive(Default)]
pub struct TransformerChain {
    units: RwLock<Vec<Arc<dyn ClassTransformer>>>,
}

impl fmt::Debug for TransformerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerChain")
            .field("units", &self.names())
            .finish()
    }
}

impl TransformerChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit to the end of the chain
    pub fn register_transformer(&self, unit: Arc<dyn ClassTransformer>) {
        tracing::debug!(transformer = unit.name(), "Transformer registered");
        self.units
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(unit);
    }

    /// Run every unit over `bytes`, using `name` as the transformed name.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transformation`] naming the first unit that fails.
    pub fn apply(&self, name: &str, bytes: Vec<u8>) -> HarnessResult<Vec<u8>> {
        self.apply_named(name, name, bytes)
    }

    /// Run every unit over `bytes` in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transformation`] naming the first unit that
    /// fails. Later units are not invoked.
    pub fn apply_named(
        &self,
        name: &str,
        transformed_name: &str,
        bytes: Vec<u8>,
    ) -> HarnessResult<Vec<u8>> {
        let units = self
            .units
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        units.iter().try_fold(bytes, |current, unit| {
            unit.transform(name, transformed_name, current)
                .map_err(|source| HarnessError::Transformation {
                    transformer: unit.name().to_string(),
                    class_name: name.to_string(),
                    source,
                })
        })
    }

    /// Names of the registered units, in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.units
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|unit| unit.name().to_string())
            .collect()
    }

    /// Number of registered units
    #[must_use]
    pub fn len(&self) -> usize {
        self.units
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the chain has no units
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
