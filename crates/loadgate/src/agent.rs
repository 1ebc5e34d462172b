//! Attaching the hook to the runtime.
//!
//! The runtime's instrumentation facility is a capability:
//! [`Instrumentation`]. How the harness obtains it is a strategy: either a
//! host agent is already present ([`PreAttached`]) or the harness installs
//! one itself ([`SelfAttach`]). [`AttachPlan`] tries the primary strategy
//! and falls back only when no host agent was found.

use crate::hook::ClassFileHook;
use crate::result::{HarnessError, HarnessResult};
use std::fmt;
use std::sync::Arc;

/// What the user must supply when no strategy can attach
pub const AGENT_PREREQUISITE: &str =
    "start the test JVM with -javaagent:<instrumentation-agent>.jar, or run on a JDK that permits self-attach";

/// The runtime's class-load instrumentation facility
pub trait Instrumentation: Send + Sync {
    /// Register a hook on the class-loading path.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejects the hook.
    fn add_transformer(&self, hook: Arc<ClassFileHook>) -> HarnessResult<()>;
}

/// Why a strategy could not provide instrumentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachFailure {
    /// No host agent is running in this process
    AgentNotPresent,
    /// The mechanism exists but refused
    Unsupported(String),
}

impl fmt::Display for AttachFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AgentNotPresent => f.write_str("no instrumentation agent is attached"),
            Self::Unsupported(reason) => write!(f, "attach unsupported: {reason}"),
        }
    }
}

/// A way of obtaining [`Instrumentation`]
pub trait AttachStrategy: Send + Sync {
    /// Strategy name for logs and reports
    fn name(&self) -> &str;

    /// Obtain the instrumentation facility.
    ///
    /// # Errors
    ///
    /// Returns an [`AttachFailure`] describing why it is unavailable.
    fn attach(&self) -> Result<Arc<dyn Instrumentation>, AttachFailure>;
}

/// Uses an agent the host started before the harness ran
#[derive(Clone, Default)]
pub struct PreAttached {
    instrumentation: Option<Arc<dyn Instrumentation>>,
}

impl fmt::Debug for PreAttached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreAttached")
            .field("present", &self.instrumentation.is_some())
            .finish()
    }
}

impl PreAttached {
    /// A host agent that is present
    #[must_use]
    pub fn new(instrumentation: Arc<dyn Instrumentation>) -> Self {
        Self {
            instrumentation: Some(instrumentation),
        }
    }

    /// No host agent in this process
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }
}

impl AttachStrategy for PreAttached {
    fn name(&self) -> &str {
        "pre-attached"
    }

    fn attach(&self) -> Result<Arc<dyn Instrumentation>, AttachFailure> {
        self.instrumentation
            .clone()
            .ok_or(AttachFailure::AgentNotPresent)
    }
}

type InstallFn = dyn Fn() -> Result<Arc<dyn Instrumentation>, AttachFailure> + Send + Sync;

/// Installs an agent into the running process
pub struct SelfAttach {
    install: Box<InstallFn>,
}

impl fmt::Debug for SelfAttach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfAttach").finish_non_exhaustive()
    }
}

impl SelfAttach {
    /// Create from an install routine
    pub fn new<F>(install: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Instrumentation>, AttachFailure> + Send + Sync + 'static,
    {
        Self {
            install: Box::new(install),
        }
    }

    /// A self-attach that always fails, for hosts without the capability
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move || Err(AttachFailure::Unsupported(reason.clone())))
    }
}

impl AttachStrategy for SelfAttach {
    fn name(&self) -> &str {
        "self-attach"
    }

    fn attach(&self) -> Result<Arc<dyn Instrumentation>, AttachFailure> {
        (self.install)()
    }
}

/// Primary strategy plus optional fallback
pub struct AttachPlan {
    primary: Box<dyn AttachStrategy>,
    fallback: Option<Box<dyn AttachStrategy>>,
}

impl fmt::Debug for AttachPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachPlan")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl AttachPlan {
    /// A plan with only a primary strategy
    #[must_use]
    pub fn new(primary: impl AttachStrategy + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            fallback: None,
        }
    }

    /// Add the strategy tried when no host agent is present
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl AttachStrategy + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Attach and register `hook`. Returns the name of the strategy used.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Attachment`] naming [`AGENT_PREREQUISITE`]
    /// when neither strategy can provide instrumentation, or the runtime's
    /// error if it rejects the hook.
    pub fn install(&self, hook: Arc<ClassFileHook>) -> HarnessResult<String> {
        let (strategy, instrumentation) = match self.primary.attach() {
            Ok(inst) => (self.primary.as_ref(), inst),
            Err(AttachFailure::AgentNotPresent) => {
                let Some(fallback) = self.fallback.as_deref() else {
                    return Err(attachment_error(&AttachFailure::AgentNotPresent));
                };
                tracing::debug!(
                    primary = self.primary.name(),
                    fallback = fallback.name(),
                    "No host agent present, trying fallback"
                );
                let inst = fallback.attach().map_err(|e| attachment_error(&e))?;
                (fallback, inst)
            }
            Err(other) => return Err(attachment_error(&other)),
        };

        instrumentation.add_transformer(hook)?;
        tracing::info!(strategy = strategy.name(), "Instrumentation hook installed");
        Ok(strategy.name().to_string())
    }
}

fn attachment_error(failure: &AttachFailure) -> HarnessError {
    HarnessError::Attachment {
        message: failure.to_string(),
        prerequisite: AGENT_PREREQUISITE.to_string(),
    }
}
