//! One-time session bootstrap.
//!
//! [`SessionBootstrap`] owns the harness's shared state and runs the
//! bootstrap sequence exactly once, no matter how many threads call
//! [`SessionBootstrap::ensure_ready`]:
//!
//! ```text
//! NotStarted ──claim──► Initializing ──ok──► Ready
//!                            │
//!                            └──error──► Failed
//! ```
//!
//! The winning caller holds the session lock for the whole sequence.
//! Everyone else blocks on that lock and then observes the final state.
//! A nested call from the winning thread itself (for example from an
//! `on_ready` callback) does not touch the lock: it succeeds once the
//! gate is open and fails with [`HarnessError::SessionAborted`] before.
//!
//! # Example
//!
//! ```ignore
//! let runtime = Arc::new(LocalRuntime::new());
//! let session = SessionBootstrap::builder(HarnessConfig::default())
//!     .host_agent(runtime.clone())
//!     .provider(StaticProvider::new("fixes").with_transformer("EntityPatch"))
//!     .catalog(catalog)
//!     .build()?;
//!
//! session.ensure_ready()?;
//! // protected classes may now be loaded
//! ```

use crate::agent::{AttachPlan, Instrumentation, PreAttached, SelfAttach};
use crate::chain::TransformerChain;
use crate::config::HarnessConfig;
use crate::exclusion::{ExclusionRegistry, BASELINE_EXCLUSIONS};
use crate::gate::LoadGate;
use crate::hook::ClassFileHook;
use crate::probe::ProbeVerifier;
use crate::provider::{PatchProvider, TransformerCatalog};
use crate::remap::RemapTable;
use crate::report::{BootstrapReport, BootstrapStep, StepStatus};
use crate::result::{HarnessError, HarnessResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No caller has claimed the bootstrap yet
    NotStarted,
    /// The bootstrap sequence is running
    Initializing,
    /// The gate is open and downstream setup has run
    Ready,
    /// The bootstrap aborted; the session is unusable
    Failed,
}

impl SessionState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Failed => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

type ReadyCallback = Box<dyn FnOnce() -> HarnessResult<()> + Send>;

/// Inputs consumed by the winning caller
struct Setup {
    config: HarnessConfig,
    attach: AttachPlan,
    provider: Option<Box<dyn PatchProvider>>,
    catalog: TransformerCatalog,
    on_ready: Vec<ReadyCallback>,
}

#[derive(Default)]
struct Inner {
    setup: Option<Setup>,
    report: Option<BootstrapReport>,
    failure: Option<String>,
}

/// Builder for [`SessionBootstrap`]
pub struct SessionBuilder {
    config: HarnessConfig,
    host_agent: Option<Arc<dyn Instrumentation>>,
    self_attach: Option<SelfAttach>,
    provider: Option<Box<dyn PatchProvider>>,
    catalog: TransformerCatalog,
    on_ready: Vec<ReadyCallback>,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("config", &self.config)
            .field("host_agent", &self.host_agent.is_some())
            .field("self_attach", &self.self_attach.is_some())
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("catalog", &self.catalog)
            .field("on_ready", &self.on_ready.len())
            .finish()
    }
}

impl SessionBuilder {
    /// Instrumentation provided by an agent the host already started
    #[must_use]
    pub fn host_agent(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.host_agent = Some(instrumentation);
        self
    }

    /// Strategy used when no host agent is present
    #[must_use]
    pub fn self_attach(mut self, strategy: SelfAttach) -> Self {
        self.self_attach = Some(strategy);
        self
    }

    /// The patch provider whose transformers are installed
    #[must_use]
    pub fn provider(mut self, provider: impl PatchProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Constructors for transformer names
    #[must_use]
    pub fn catalog(mut self, catalog: TransformerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Downstream setup to run once the gate is open
    #[must_use]
    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() -> HarnessResult<()> + Send + 'static,
    {
        self.on_ready.push(Box::new(callback));
        self
    }

    /// Validate the configuration and create the session.
    ///
    /// Nothing is attached or registered until
    /// [`SessionBootstrap::ensure_ready`] runs.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if the configuration is invalid.
    pub fn build(self) -> HarnessResult<SessionBootstrap> {
        self.config.validate()?;

        let primary = self
            .host_agent
            .map_or_else(PreAttached::absent, PreAttached::new);
        let mut attach = AttachPlan::new(primary);
        if self.config.self_attach {
            if let Some(strategy) = self.self_attach {
                attach = attach.with_fallback(strategy);
            }
        }

        let exclusions = Arc::new(ExclusionRegistry::new());
        let chain = Arc::new(TransformerChain::new());
        let gate = Arc::new(LoadGate::new(&self.config.protected_prefixes));
        let hook = Arc::new(ClassFileHook::new(
            Arc::clone(&exclusions),
            Arc::clone(&chain),
            Arc::clone(&gate),
        ));

        Ok(SessionBootstrap {
            claimed: AtomicBool::new(false),
            owner: Mutex::new(None),
            state: AtomicU8::new(SessionState::NotStarted.as_u8()),
            inner: Mutex::new(Inner {
                setup: Some(Setup {
                    config: self.config,
                    attach,
                    provider: self.provider,
                    catalog: self.catalog,
                    on_ready: self.on_ready,
                }),
                ..Inner::default()
            }),
            exclusions,
            chain,
            gate,
            hook,
        })
    }
}

/// Releases ownership when the winning call returns or unwinds
struct Claim<'a> {
    session: &'a SessionBootstrap,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.session.set_owner(None);
        if self.session.state() == SessionState::Initializing {
            self.session.set_state(SessionState::Failed);
        }
    }
}

/// Coordinator for the one-time bootstrap
pub struct SessionBootstrap {
    claimed: AtomicBool,
    owner: Mutex<Option<ThreadId>>,
    state: AtomicU8,
    inner: Mutex<Inner>,
    exclusions: Arc<ExclusionRegistry>,
    chain: Arc<TransformerChain>,
    gate: Arc<LoadGate>,
    hook: Arc<ClassFileHook>,
}

impl fmt::Debug for SessionBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBootstrap")
            .field("state", &self.state())
            .field("exclusions", &self.exclusions.len())
            .field("chain", &self.chain)
            .field("gate_open", &self.gate.is_open())
            .finish()
    }
}

static GLOBAL: OnceLock<SessionBootstrap> = OnceLock::new();

impl SessionBootstrap {
    /// Start building a session
    #[must_use]
    pub fn builder(config: HarnessConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            host_agent: None,
            self_attach: None,
            provider: None,
            catalog: TransformerCatalog::new(),
            on_ready: Vec::new(),
        }
    }

    /// Open the process-wide session, building it with `init` on first use.
    ///
    /// `init` may run on more than one racing thread; only one result is
    /// kept, and the bootstrap sequence still runs once.
    ///
    /// # Errors
    ///
    /// Returns the error from `init` or from [`SessionBootstrap::ensure_ready`].
    pub fn open_global<F>(init: F) -> HarnessResult<&'static Self>
    where
        F: FnOnce() -> HarnessResult<Self>,
    {
        let session = match GLOBAL.get() {
            Some(session) => session,
            None => {
                let built = init()?;
                let _ = GLOBAL.set(built);
                GLOBAL.get().ok_or_else(|| HarnessError::SessionAborted {
                    message: "global session was not stored".to_string(),
                })?
            }
        };
        session.ensure_ready()?;
        Ok(session)
    }

    /// The process-wide session, if one has been opened
    #[must_use]
    pub fn global() -> Option<&'static Self> {
        GLOBAL.get()
    }

    /// Run the bootstrap if nobody has, otherwise wait for it.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that aborted the bootstrap (to the caller
    /// that ran it) or [`HarnessError::SessionAborted`] (to everyone else).
    pub fn ensure_ready(&self) -> HarnessResult<()> {
        if self.is_ready() {
            return Ok(());
        }
        if self.state() == SessionState::Initializing && self.owned_by_current_thread() {
            return self.nested_call();
        }

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return match self.state() {
                SessionState::Ready => Ok(()),
                state => Err(HarnessError::SessionAborted {
                    message: inner.failure.clone().unwrap_or_else(|| {
                        format!("bootstrap did not complete (state {state:?})")
                    }),
                }),
            };
        }

        self.set_owner(Some(thread::current().id()));
        self.set_state(SessionState::Initializing);
        let _claim = Claim { session: self };
        let Some(setup) = inner.setup.take() else {
            self.set_state(SessionState::Failed);
            return Err(HarnessError::SessionAborted {
                message: "session setup already consumed".to_string(),
            });
        };

        let mut report = BootstrapReport::new();
        tracing::info!(session = %report.session_id, "Bootstrapping harness session");
        let result = self.run_sequence(setup, &mut report);
        report.hook_stats = self.hook.stats();

        match result {
            Ok(()) => {
                inner.report = Some(report);
                self.set_state(SessionState::Ready);
                tracing::info!("Harness session ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Harness bootstrap aborted");
                inner.failure = Some(e.to_string());
                inner.report = Some(report);
                self.set_state(SessionState::Failed);
                Err(e)
            }
        }
    }

    fn run_sequence(&self, setup: Setup, report: &mut BootstrapReport) -> HarnessResult<()> {
        let Setup {
            config,
            attach,
            mut provider,
            catalog,
            on_ready,
        } = setup;

        timed(report, BootstrapStep::Attach, || {
            attach.install(Arc::clone(&self.hook))
        })?;

        timed(report, BootstrapStep::Exclusions, || {
            self.exclusions
                .register_all(BASELINE_EXCLUSIONS.iter().copied());
            if let Some(provider) = &provider {
                for prefix in provider.exclusions() {
                    self.exclusions.register_exclusion(&prefix);
                }
            }
            for prefix in &config.extra_exclusions {
                self.exclusions.register_exclusion(prefix);
            }
            Ok(format!("{} prefixes", self.exclusions.len()))
        })?;

        let remap_path = config.resolved_remap_path();
        timed(report, BootstrapStep::Remap, || {
            let table = match RemapTable::load_or_empty(&remap_path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!(path = %remap_path.display(), error = %e, "Remap table unusable; continuing without it");
                    RemapTable::new()
                }
            };
            let detail = format!("{} classes from {}", table.len(), remap_path.display());
            self.hook.set_remap(table);
            Ok(detail)
        })?;

        let mut late_configs = Vec::new();
        timed(report, BootstrapStep::Transformers, || {
            let mut names = Vec::new();
            if let Some(provider) = provider.as_mut() {
                let data = HashMap::from([
                    ("side".to_string(), config.side.as_str().to_string()),
                    ("remap_path".to_string(), remap_path.display().to_string()),
                ]);
                provider.inject_data(&data);
                late_configs = provider.late_configs();
                if !late_configs.is_empty() {
                    tracing::info!(provider = provider.name(), configs = ?late_configs, "Late mixin configurations registered");
                }
                names.extend(provider.transformer_classes());
            }
            names.extend(config.transformers.iter().cloned());
            for name in &names {
                let unit = catalog.instantiate(name)?;
                self.chain.register_transformer(unit);
            }
            Ok(format!(
                "{} transformers, {} late configs",
                self.chain.len(),
                late_configs.len()
            ))
        })?;
        report.late_configs = late_configs;

        let mut probe = None;
        timed(report, BootstrapStep::Probe, || {
            let verifier = ProbeVerifier::new(&config.probe_name);
            verifier.ensure_isolated(&self.exclusions, &self.gate)?;
            let outcome = verifier.run(&self.chain, &self.gate)?;
            let detail = format!("{} -> {} bytes", outcome.input_len, outcome.output_len);
            probe = Some(outcome);
            Ok(detail)
        })?;
        report.probe = probe;

        timed(report, BootstrapStep::Handoff, || {
            if !self.gate.is_open() {
                return Err(HarnessError::GateClosed {
                    class_name: config.probe_name.clone(),
                });
            }
            let count = on_ready.len();
            for callback in on_ready {
                callback()?;
            }
            Ok(format!("{count} downstream callbacks"))
        })?;

        Ok(())
    }

    fn set_owner(&self, owner: Option<ThreadId>) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = owner;
    }

    fn owned_by_current_thread(&self) -> bool {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }

    /// Re-entry from the thread running the bootstrap
    fn nested_call(&self) -> HarnessResult<()> {
        if self.gate.is_open() {
            tracing::debug!("Nested session open during handoff");
            Ok(())
        } else {
            Err(HarnessError::SessionAborted {
                message: "session opened again from inside its own bootstrap, before the load gate opened"
                    .to_string(),
            })
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether downstream code may load protected classes
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Report of the bootstrap, with current hook counters
    #[must_use]
    pub fn report(&self) -> Option<BootstrapReport> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.report.clone().map(|mut report| {
            report.hook_stats = self.hook.stats();
            report
        })
    }

    /// The installed hook
    #[must_use]
    pub fn hook(&self) -> &Arc<ClassFileHook> {
        &self.hook
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
}

fn timed<F>(report: &mut BootstrapReport, step: BootstrapStep, f: F) -> HarnessResult<()>
where
    F: FnOnce() -> HarnessResult<String>,
{
    let started = Instant::now();
    match f() {
        Ok(detail) => {
            tracing::debug!(step = step.name(), detail = %detail, "Bootstrap step complete");
            report.record(step, StepStatus::Ok, started, detail);
            Ok(())
        }
        Err(e) => {
            report.record(step, StepStatus::Failed, started, e.to_string());
            Err(e)
        }
    }
}
