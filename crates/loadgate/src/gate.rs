//! One-shot load gate for protected classes.

use crate::exclusion::normalize_name;
use crate::result::{HarnessError, HarnessResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// Protected prefix used when none is configured
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &["net/minecraft/"];

/// Withholds protected classes until the probe has passed.
///
/// The flag only ever moves from closed to open.
#[derive(Debug)]
pub struct LoadGate {
    open: AtomicBool,
    protected: Vec<String>,
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_PREFIXES.iter().copied())
    }
}

impl LoadGate {
    /// Create a closed gate guarding the given prefixes
    pub fn new<I, S>(protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            open: AtomicBool::new(false),
            protected: protected
                .into_iter()
                .map(|p| normalize_name(p.as_ref()).into_owned())
                .collect(),
        }
    }

    /// Open the gate. Idempotent.
    pub fn open(&self) {
        if !self.open.swap(true, Ordering::AcqRel) {
            tracing::info!("Load gate opened");
        }
    }

    /// Whether the gate is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Whether `name` falls under a protected prefix
    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.protected.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// The protected prefixes
    #[must_use]
    pub fn protected_prefixes(&self) -> &[String] {
        &self.protected
    }

    /// Refuse a protected name while the gate is closed.
    ///
    /// Unprotected names always pass.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::GateClosed`] for a protected name before
    /// [`LoadGate::open`] has been called.
    pub fn check_or_refuse(&self, name: &str) -> HarnessResult<()> {
        if self.is_open() || !self.is_protected(name) {
            return Ok(());
        }
        Err(HarnessError::GateClosed {
            class_name: normalize_name(name).into_owned(),
        })
    }
}
