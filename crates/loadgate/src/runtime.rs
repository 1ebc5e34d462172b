//! In-process managed runtime model.
//!
//! [`LocalRuntime`] stands in for the host runtime's class-loading path:
//! hooks registered through [`Instrumentation`] see every class passed to
//! [`LocalRuntime::define_class`], and the final bytes must parse as a
//! class declaring the requested name.

use crate::agent::Instrumentation;
use crate::classfile::ClassHeader;
use crate::exclusion::normalize_name;
use crate::hook::{ClassFileHook, LoaderContext};
use crate::result::{HarnessError, HarnessResult};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A class-loading runtime living in this process
#[derive(Debug, Default)]
pub struct LocalRuntime {
    hooks: RwLock<Vec<Arc<ClassFileHook>>>,
    defined: RwLock<BTreeMap<String, ClassHeader>>,
}

impl LocalRuntime {
    /// Create a runtime with no hooks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of installed hooks
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Define a class, running every hook over its bytes first.
    ///
    /// # Errors
    ///
    /// Returns the hook's error as a load failure for this class, a
    /// [`HarnessError::ClassFormat`] if the final bytes are not a class
    /// named `name`, or if `name` was already defined. Of two concurrent
    /// definitions of one name exactly one succeeds.
    pub fn define_class(
        &self,
        ctx: &LoaderContext,
        name: &str,
        bytes: &[u8],
    ) -> HarnessResult<Vec<u8>> {
        let name = normalize_name(name).into_owned();
        if self.is_defined(&name) {
            return Err(HarnessError::class_format(format!(
                "duplicate class definition for {name}"
            )));
        }

        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let mut current = bytes.to_vec();
        for hook in &hooks {
            if let Some(rewritten) = hook.transform(ctx, &name, &current)? {
                current = rewritten;
            }
        }

        let header = ClassHeader::parse(&current)?;
        if header.this_class != name {
            return Err(HarnessError::class_format(format!(
                "{name} resolved to bytes declaring {}",
                header.this_class
            )));
        }

        let mut defined = self
            .defined
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match defined.entry(name) {
            Entry::Occupied(entry) => Err(HarnessError::class_format(format!(
                "duplicate class definition for {}",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                tracing::debug!(class = %entry.key(), loader = %ctx.loader, "Class defined");
                let _ = entry.insert(header);
                Ok(current)
            }
        }
    }

    /// Whether `name` has been defined
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(normalize_name(name).as_ref())
    }

    /// Header of a defined class
    #[must_use]
    pub fn header(&self, name: &str) -> Option<ClassHeader> {
        self.defined
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(normalize_name(name).as_ref())
            .cloned()
    }

    /// Names of all defined classes, sorted
    #[must_use]
    pub fn defined_classes(&self) -> Vec<String> {
        self.defined
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Instrumentation for LocalRuntime {
    fn add_transformer(&self, hook: Arc<ClassFileHook>) -> HarnessResult<()> {
        self.hooks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(hook);
        Ok(())
    }
}
