//! Loadgate: class-load instrumentation bootstrap for test sessions
//!
//! Loadgate prepares a managed runtime so that test code can load game
//! classes with bytecode patches already applied. Before any protected
//! class is loaded it installs a single class-file hook, registers the
//! transformers a patch provider names, and proves the chain works by
//! pushing a synthetic probe class through it. Only then does the load
//! gate open.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     LOADGATE Architecture                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//! │  │ Session      │──►│ Attach       │──►│ ClassFileHook        │  │
//! │  │ Bootstrap    │   │ Strategy     │   │  ├ ExclusionRegistry │  │
//! │  │ (once)       │   └──────────────┘   │  ├ LoadGate          │  │
//! │  │              │                      │  └ TransformerChain  │  │
//! │  │              │──► ProbeVerifier ───►│      (ordered)       │  │
//! │  └──────────────┘   opens the gate     └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use loadgate::{HarnessConfig, LocalRuntime, SessionBootstrap};
//! use std::sync::Arc;
//!
//! let runtime = Arc::new(LocalRuntime::new());
//! let session = SessionBootstrap::builder(
//!     HarnessConfig::new().with_remap_path("/nonexistent/mappings.srg"),
//! )
//! .host_agent(runtime)
//! .build()?;
//!
//! session.ensure_ready()?;
//! assert!(session.gate().is_open());
//! # Ok::<(), loadgate::HarnessError>(())
//! ```

#![warn(missing_docs)]

pub mod agent;
pub mod chain;
pub mod classfile;
mod config;
mod exclusion;
mod gate;
mod hook;
pub mod logging;
mod probe;
mod provider;
mod remap;
mod report;
mod result;
mod runtime;
mod session;

pub use agent::{
    AttachFailure, AttachPlan, AttachStrategy, Instrumentation, PreAttached, SelfAttach,
    AGENT_PREREQUISITE,
};
pub use chain::{ClassTransformer, FnTransformer, TransformerChain};
pub use classfile::{ClassHeader, ClassWriter, MethodInfo};
pub use config::{HarnessConfig, Side, DEFAULT_REMAP_PATH, REMAP_PATH_ENV};
pub use exclusion::{normalize_name, ExclusionRegistry, BASELINE_EXCLUSIONS};
pub use gate::{LoadGate, DEFAULT_PROTECTED_PREFIXES};
pub use hook::{ClassFileHook, HookStats, LoaderContext};
pub use logging::Verbosity;
pub use probe::{build_probe_class, ProbeOutcome, ProbeVerifier, DEFAULT_PROBE_NAME};
pub use provider::{PatchProvider, StaticProvider, TransformerCatalog};
pub use remap::RemapTable;
pub use report::{BootstrapReport, BootstrapStep, StepRecord, StepStatus};
pub use result::{HarnessError, HarnessResult, TransformFailure};
pub use runtime::LocalRuntime;
pub use session::{SessionBootstrap, SessionBuilder, SessionState};
