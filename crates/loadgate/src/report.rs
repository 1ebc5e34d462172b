//! Bootstrap report.
//!
//! Records each bootstrap step with its timing and outcome, plus what the
//! probe observed. Serializable so the CLI and test runners can keep it.

use crate::hook::HookStats;
use crate::probe::ProbeOutcome;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Bootstrap steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStep {
    /// Install the hook into the runtime
    Attach,
    /// Register baseline and provider exclusions
    Exclusions,
    /// Load the remap table
    Remap,
    /// Instantiate and register transformers
    Transformers,
    /// Run the probe and open the gate
    Probe,
    /// Hand control to downstream setup
    Handoff,
}

impl BootstrapStep {
    /// Step name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Exclusions => "exclusions",
            Self::Remap => "remap",
            Self::Transformers => "transformers",
            Self::Probe => "probe",
            Self::Handoff => "handoff",
        }
    }
}

/// Outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step completed
    Ok,
    /// Step aborted the session
    Failed,
}

/// One executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Which step
    pub step: BootstrapStep,
    /// How it ended
    pub status: StepStatus,
    /// Wall time spent
    pub duration_ms: u64,
    /// Free-form detail (strategy used, counts, error text)
    pub detail: String,
}

/// Everything a bootstrap did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Unique session id
    pub session_id: String,
    /// Executed steps
    pub steps: Vec<StepRecord>,
    /// Probe result, once the probe has passed
    pub probe: Option<ProbeOutcome>,
    /// Late mixin configurations the provider asked for
    #[serde(default)]
    pub late_configs: Vec<String>,
    /// Hook counters at the time the report was taken
    pub hook_stats: HookStats,
}

impl Default for BootstrapReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapReport {
    /// Create an empty report with a fresh session id
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            steps: Vec::new(),
            probe: None,
            late_configs: Vec::new(),
            hook_stats: HookStats::default(),
        }
    }

    /// Record a step that started at `started`
    pub fn record(
        &mut self,
        step: BootstrapStep,
        status: StepStatus,
        started: Instant,
        detail: impl Into<String>,
    ) {
        self.steps.push(StepRecord {
            step,
            status,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            detail: detail.into(),
        });
    }

    /// Record of `step`, if it ran
    #[must_use]
    pub fn step(&self, step: BootstrapStep) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// Whether every recorded step succeeded
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|r| r.status == StepStatus::Ok)
    }

    /// Total time across all steps
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|r| r.duration_ms).sum()
    }

    /// Render as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::result::HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
