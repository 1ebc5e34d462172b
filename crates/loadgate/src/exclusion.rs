//! Exclusion rules for the class-load hook.
//!
//! Prefixes are matched against the internal (`/`-separated) form of a
//! class name. Rules are append-only for the life of the process.

use std::borrow::Cow;
use std::sync::RwLock;

/// Infrastructure packages the hook must never rewrite.
///
/// Covers runtime internals, the logging and test frameworks, the mixin
/// stack and the harness's own package.
pub const BASELINE_EXCLUSIONS: &[&str] = &[
    "java/",
    "javax/",
    "sun/",
    "com/sun/",
    "jdk/",
    "org/apache/logging/",
    "org/junit/",
    "org/spongepowered/",
    "com/llamalad7/mixinextras/",
    "loadgate/",
];

/// Convert a binary name (`a.b.C`) to its internal form (`a/b/C`).
#[must_use]
pub fn normalize_name(name: &str) -> Cow<'_, str> {
    if name.contains('.') {
        Cow::Owned(name.replace('.', "/"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Registry of path-prefix exclusion rules.
#[derive(Debug, Default)]
pub struct ExclusionRegistry {
    prefixes: RwLock<Vec<String>>,
}

impl ExclusionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with [`BASELINE_EXCLUSIONS`]
    #[must_use]
    pub fn with_baseline() -> Self {
        let registry = Self::new();
        registry.register_all(BASELINE_EXCLUSIONS.iter().copied());
        registry
    }

    /// Register a prefix. Registering the same prefix again has no effect.
    pub fn register_exclusion(&self, prefix: &str) {
        let prefix = normalize_name(prefix).into_owned();
        let mut prefixes = self
            .prefixes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !prefixes.contains(&prefix) {
            prefixes.push(prefix);
        }
    }

    /// Register several prefixes in order
    pub fn register_all<'a>(&self, prefixes: impl IntoIterator<Item = &'a str>) {
        for prefix in prefixes {
            self.register_exclusion(prefix);
        }
    }

    /// Whether any registered prefix is a prefix of `name`
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.prefixes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Snapshot of the registered prefixes in registration order
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        self.prefixes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of distinct prefixes
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether no prefix is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Matching
    // =========================================================================

    #[test]
    fn test_empty_registry_excludes_nothing() {
        let registry = ExclusionRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.is_excluded("java/lang/Object"));
    }

    #[test]
    fn test_prefix_match() {
        let registry = ExclusionRegistry::new();
        registry.register_exclusion("lib/");
        assert!(registry.is_excluded("lib/Util"));
        assert!(registry.is_excluded("lib/deep/Nested"));
        assert!(!registry.is_excluded("library/Util"));
        assert!(!registry.is_excluded("pkg/lib/Util"));
    }

    #[test]
    fn test_dotted_names_are_normalized() {
        let registry = ExclusionRegistry::new();
        registry.register_exclusion("org.junit.");
        assert!(registry.is_excluded("org/junit/Test"));
        assert!(registry.is_excluded("org.junit.jupiter.api.Test"));
        assert_eq!(registry.prefixes(), vec!["org/junit/".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_is_idempotent() {
        let registry = ExclusionRegistry::new();
        registry.register_exclusion("sun/");
        registry.register_exclusion("sun/");
        registry.register_exclusion("sun.");
        assert_eq!(registry.len(), 1);
        assert!(registry.is_excluded("sun/misc/Unsafe"));
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = ExclusionRegistry::new();
        registry.register_all(["b/", "a/", "c/"]);
        assert_eq!(registry.prefixes(), vec!["b/", "a/", "c/"]);
    }

    // =========================================================================
    // Baseline
    // =========================================================================

    #[test]
    fn test_baseline_covers_infrastructure() {
        let registry = ExclusionRegistry::with_baseline();
        assert_eq!(registry.len(), BASELINE_EXCLUSIONS.len());
        assert!(registry.is_excluded("java/lang/String"));
        assert!(registry.is_excluded("org/spongepowered/asm/mixin/Mixin"));
        assert!(registry.is_excluded("loadgate/session/Bootstrap"));
        assert!(!registry.is_excluded("net/minecraft/entity/Entity"));
        assert!(!registry.is_excluded("loadgate_synthetic/Probe$0"));
    }

    #[test]
    fn test_normalize_borrows_internal_names() {
        assert!(matches!(normalize_name("a/b/C"), Cow::Borrowed(_)));
        assert_eq!(normalize_name("a.b.C"), "a/b/C");
    }

    // =========================================================================
    // Properties
    // =========================================================================

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_registered_prefix_matches_extensions(
                prefix in "[a-z]{1,8}/",
                suffix in "[A-Za-z0-9/$]{0,16}"
            ) {
                let registry = ExclusionRegistry::new();
                registry.register_exclusion(&prefix);
                let name = format!("{prefix}{suffix}");
                prop_assert!(registry.is_excluded(&name));
            }

            #[test]
            fn prop_unmatched_names_not_excluded(
                prefix in "[a-m]{1,8}/",
                name in "[n-z]{1,8}/[A-Z][a-z]{0,8}"
            ) {
                let registry = ExclusionRegistry::new();
                registry.register_exclusion(&prefix);
                prop_assert!(!registry.is_excluded(&name));
            }

            #[test]
            fn prop_double_registration_same_as_single(
                prefix in "[a-z]{1,4}/",
                name in "[a-z]{1,4}/[A-Z]{1,4}"
            ) {
                let once = ExclusionRegistry::new();
                once.register_exclusion(&prefix);
                let twice = ExclusionRegistry::new();
                twice.register_exclusion(&prefix);
                twice.register_exclusion(&prefix);
                prop_assert_eq!(once.is_excluded(&name), twice.is_excluded(&name));
                prop_assert_eq!(once.prefixes(), twice.prefixes());
            }
        }
    }
}
