//! The class-load hook installed into the runtime.
//!
//! Per class: excluded names are returned untouched, protected names must
//! pass the load gate, and everything else runs through the transformer
//! chain under both its loaded and its remapped name.

use crate::chain::TransformerChain;
use crate::exclusion::{normalize_name, ExclusionRegistry};
use crate::gate::LoadGate;
use crate::remap::RemapTable;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Identifies the loader a class is being defined by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderContext {
    /// Loader name
    pub loader: String,
    /// Protection domain label, if the runtime supplies one
    pub protection_domain: Option<String>,
}

impl LoaderContext {
    /// Create a context for a named loader
    #[must_use]
    pub fn new(loader: impl Into<String>) -> Self {
        Self {
            loader: loader.into(),
            protection_domain: None,
        }
    }

    /// Set the protection domain label
    #[must_use]
    pub fn with_protection_domain(mut self, domain: impl Into<String>) -> Self {
        self.protection_domain = Some(domain.into());
        self
    }
}

/// Counters kept by the hook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStats {
    /// Classes passed through the chain
    pub transformed: u64,
    /// Classes skipped by an exclusion rule
    pub excluded: u64,
    /// Classes whose transformation failed
    pub failed: u64,
    /// Protected classes refused by the closed gate
    pub refused: u64,
}

/// The instrumentation hook
#[derive(Debug)]
pub struct ClassFileHook {
    exclusions: Arc<ExclusionRegistry>,
    chain: Arc<TransformerChain>,
    gate: Arc<LoadGate>,
    remap: OnceLock<RemapTable>,
    transformed: AtomicU64,
    excluded: AtomicU64,
    failed: AtomicU64,
    refused: AtomicU64,
}

impl ClassFileHook {
    /// Create a hook over shared registry, chain and gate
    #[must_use]
    pub fn new(
        exclusions: Arc<ExclusionRegistry>,
        chain: Arc<TransformerChain>,
        gate: Arc<LoadGate>,
    ) -> Self {
        Self {
            exclusions,
            chain,
            gate,
            remap: OnceLock::new(),
            transformed: AtomicU64::new(0),
            excluded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        }
    }

    /// The exclusion registry
    #[must_use]
    pub fn exclusions(&self) -> &ExclusionRegistry {
        &self.exclusions
    }

    /// The transformer chain
    #[must_use]
    pub fn chain(&self) -> &TransformerChain {
        &self.chain
    }

    /// The load gate
    #[must_use]
    pub fn gate(&self) -> &LoadGate {
        &self.gate
    }

    /// Install the remap table. Only the first call has an effect.
    pub fn set_remap(&self, table: RemapTable) {
        if self.remap.set(table).is_err() {
            tracing::warn!("Remap table already installed; ignoring replacement");
        }
    }

    /// Remapped name for `name`
    #[must_use]
    pub fn transformed_name(&self, name: &str) -> String {
        self.remap
            .get()
            .map_or_else(|| name.to_string(), |table| table.map(name))
    }

    /// Transform a class as it is loaded.
    ///
    /// Returns `Ok(None)` when the class is excluded and its bytes must be
    /// used unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::GateClosed`] for a protected class before the
    /// probe has passed, or [`HarnessError::Transformation`] if a unit fails
    /// on this class.
    pub fn transform(
        &self,
        ctx: &LoaderContext,
        name: &str,
        bytes: &[u8],
    ) -> HarnessResult<Option<Vec<u8>>> {
        let name = normalize_name(name);
        if self.exclusions.is_excluded(&name) {
            let _ = self.excluded.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let transformed_name = self.transformed_name(&name);
        if let Err(e) = self
            .gate
            .check_or_refuse(&name)
            .and_then(|()| self.gate.check_or_refuse(&transformed_name))
        {
            let _ = self.refused.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                class = %name,
                loader = %ctx.loader,
                domain = ?ctx.protection_domain,
                "Protected class requested before probe verification"
            );
            return Err(e);
        }

        match self
            .chain
            .apply_named(&name, &transformed_name, bytes.to_vec())
        {
            Ok(out) => {
                let _ = self.transformed.fetch_add(1, Ordering::Relaxed);
                Ok(Some(out))
            }
            Err(e) => {
                let _ = self.failed.fetch_add(1, Ordering::Relaxed);
                if let HarnessError::Transformation { transformer, .. } = &e {
                    tracing::warn!(
                        class = %name,
                        transformer = %transformer,
                        loader = %ctx.loader,
                        domain = ?ctx.protection_domain,
                        "Class transformation failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Snapshot of the hook's counters
    #[must_use]
    pub fn stats(&self) -> HookStats {
        HookStats {
            transformed: self.transformed.load(Ordering::Relaxed),
            excluded: self.excluded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FnTransformer;
    use crate::result::TransformFailure;
    use std::sync::atomic::AtomicUsize;

    fn hook_with(gate: LoadGate) -> ClassFileHook {
        ClassFileHook::new(
            Arc::new(ExclusionRegistry::new()),
            Arc::new(TransformerChain::new()),
            Arc::new(gate),
        )
    }

    fn ctx() -> LoaderContext {
        LoaderContext::new("app")
    }

    // =========================================================================
    // Exclusions
    // =========================================================================

    #[test]
    fn test_excluded_class_untouched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook = hook_with(LoadGate::new(["target/"]));
        hook.exclusions().register_exclusion("lib/");
        hook.chain()
            .register_transformer(Arc::new(FnTransformer::new("Count", move |_, _, b| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(b)
            })));

        let out = hook.transform(&ctx(), "lib/Util", &[1, 2, 3]).unwrap();
        assert!(out.is_none());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(hook.stats().excluded, 1);
    }

    // =========================================================================
    // Gate
    // =========================================================================

    #[test]
    fn test_context_with_protection_domain() {
        let ctx = LoaderContext::new("mods").with_protection_domain("file:/mods/fixes.jar");
        assert_eq!(ctx.protection_domain.as_deref(), Some("file:/mods/fixes.jar"));

        let hook = hook_with(LoadGate::new(["target/"]));
        assert!(matches!(
            hook.transform(&ctx, "target/Entity", &[]),
            Err(HarnessError::GateClosed { .. })
        ));
        hook.gate().open();
        assert_eq!(hook.transform(&ctx, "target/Entity", &[1]).unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_protected_refused_until_open() {
        let hook = hook_with(LoadGate::new(["target/"]));
        let err = hook.transform(&ctx(), "target/Entity", &[]).unwrap_err();
        assert!(matches!(err, HarnessError::GateClosed { .. }));
        assert_eq!(hook.stats().refused, 1);

        hook.gate().open();
        assert!(hook.transform(&ctx(), "target/Entity", &[]).unwrap().is_some());
    }

    #[test]
    fn test_obfuscated_protected_name_refused() {
        let hook = hook_with(LoadGate::new(["net/minecraft/"]));
        let mut table = RemapTable::new();
        table.insert("vg", "net/minecraft/entity/Entity");
        hook.set_remap(table);
        assert!(hook.transform(&ctx(), "vg", &[]).is_err());
    }

    #[test]
    fn test_unprotected_transformed_while_closed() {
        let hook = hook_with(LoadGate::new(["target/"]));
        hook.chain()
            .register_transformer(Arc::new(FnTransformer::new("Tag", |_, _, mut b| {
                b.push(0xAA);
                Ok(b)
            })));
        let out = hook.transform(&ctx(), "pkg/X", &[1]).unwrap();
        assert_eq!(out, Some(vec![1, 0xAA]));
        assert_eq!(hook.stats().transformed, 1);
    }

    // =========================================================================
    // Remapping and failures
    // =========================================================================

    #[test]
    fn test_units_receive_remapped_name() {
        let hook = hook_with(LoadGate::new(Vec::<String>::new()));
        let mut table = RemapTable::new();
        table.insert("bib", "net/minecraft/client/Minecraft");
        hook.set_remap(table);
        hook.chain()
            .register_transformer(Arc::new(FnTransformer::new("Names", |name, transformed, _| {
                Ok(format!("{name}->{transformed}").into_bytes())
            })));
        let out = hook.transform(&ctx(), "bib", &[]).unwrap().unwrap();
        assert_eq!(out, b"bib->net/minecraft/client/Minecraft");
    }

    #[test]
    fn test_second_remap_ignored() {
        let hook = hook_with(LoadGate::default());
        let mut first = RemapTable::new();
        first.insert("a", "first/A");
        let mut second = RemapTable::new();
        second.insert("a", "second/A");
        hook.set_remap(first);
        hook.set_remap(second);
        assert_eq!(hook.transformed_name("a"), "first/A");
    }

    #[test]
    fn test_failure_reported_per_class() {
        let hook = hook_with(LoadGate::new(Vec::<String>::new()));
        hook.chain()
            .register_transformer(Arc::new(FnTransformer::new("Picky", |name, _, b| {
                if name == "pkg/Bad" {
                    Err(TransformFailure::new("nope"))
                } else {
                    Ok(b)
                }
            })));

        let err = hook.transform(&ctx(), "pkg/Bad", &[]).unwrap_err();
        assert!(!err.is_fatal());
        assert!(hook.transform(&ctx(), "pkg/Good", &[]).is_ok());
        let stats = hook.stats();
        assert_eq!((stats.failed, stats.transformed), (1, 1));
    }

    #[test]
    fn test_dotted_names_normalized() {
        let hook = hook_with(LoadGate::new(Vec::<String>::new()));
        hook.chain()
            .register_transformer(Arc::new(FnTransformer::new("Echo", |name, _, _| {
                Ok(name.as_bytes().to_vec())
            })));
        let out = hook.transform(&ctx(), "pkg.inner.X", &[]).unwrap().unwrap();
        assert_eq!(out, b"pkg/inner/X");
    }
}
