//! Probe verification.
//!
//! Before any protected class may reach the transformer chain, a synthetic
//! class is pushed through it. If every unit accepts the probe the load
//! gate opens; otherwise the harness cannot be trusted and the session
//! aborts.

use crate::chain::TransformerChain;
use crate::classfile::{access, ClassWriter, JAVA_8};
use crate::exclusion::{normalize_name, ExclusionRegistry};
use crate::gate::LoadGate;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default probe class name.
///
/// `$0` is the compiler's anonymous-class suffix, which no top-level
/// source class can carry, and `loadgate_synthetic/` is owned by the
/// harness.
pub const DEFAULT_PROBE_NAME: &str = "loadgate_synthetic/Probe$0";

const OBJECT: &str = "java/lang/Object";

/// Build the probe class: public, extends `Object`, trivial constructor.
///
/// # Errors
///
/// Returns an error if `name` is not a usable class name.
pub fn build_probe_class(name: &str) -> HarnessResult<Vec<u8>> {
    let mut writer = ClassWriter::new(
        JAVA_8,
        access::ACC_PUBLIC | access::ACC_SUPER,
        name,
        OBJECT,
    )?;
    writer.add_default_constructor(OBJECT)?;
    writer.to_bytes()
}

/// What a successful probe run observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Probe class name
    pub probe_name: String,
    /// Size of the synthesized class
    pub input_len: usize,
    /// Size of the chain's output
    pub output_len: usize,
    /// SHA-256 of the chain's output, hex encoded
    pub output_sha256: String,
    /// Units the probe passed through
    pub transformers: Vec<String>,
}

/// Pushes a synthetic class through the chain and opens the gate.
#[derive(Debug, Clone)]
pub struct ProbeVerifier {
    probe_name: String,
}

impl Default for ProbeVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_NAME)
    }
}

impl ProbeVerifier {
    /// Create a verifier for a probe name
    #[must_use]
    pub fn new(probe_name: &str) -> Self {
        Self {
            probe_name: normalize_name(probe_name).into_owned(),
        }
    }

    /// The probe class name
    #[must_use]
    pub fn probe_name(&self) -> &str {
        &self.probe_name
    }

    /// Refuse a probe name the hook would skip or the gate would block.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ProbeVerification`] if the name is excluded
    /// or protected.
    pub fn ensure_isolated(
        &self,
        exclusions: &ExclusionRegistry,
        gate: &LoadGate,
    ) -> HarnessResult<()> {
        if exclusions.is_excluded(&self.probe_name) {
            return Err(self.failure("probe name is matched by an exclusion rule"));
        }
        if gate.is_protected(&self.probe_name) {
            return Err(self.failure("probe name falls under a protected prefix"));
        }
        Ok(())
    }

    /// Apply the chain to a fresh probe and open the gate on success.
    ///
    /// The chain's output is not inspected; the run succeeds iff every
    /// unit returns without failure.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ProbeVerification`] if the probe cannot be
    /// built or any unit fails on it. The gate stays closed.
    pub fn run(&self, chain: &TransformerChain, gate: &LoadGate) -> HarnessResult<ProbeOutcome> {
        let probe = build_probe_class(&self.probe_name)
            .map_err(|e| self.failure(format!("could not synthesize probe: {e}")))?;
        let input_len = probe.len();

        let output = chain
            .apply(&self.probe_name, probe)
            .map_err(|e| self.failure(e.to_string()))?;

        gate.open();
        tracing::info!(
            probe = %self.probe_name,
            transformers = chain.len(),
            "Probe passed the transformer chain"
        );

        Ok(ProbeOutcome {
            probe_name: self.probe_name.clone(),
            input_len,
            output_len: output.len(),
            output_sha256: hex_digest(&output),
            transformers: chain.names(),
        })
    }

    fn failure(&self, message: impl Into<String>) -> HarnessError {
        HarnessError::ProbeVerification {
            probe: self.probe_name.clone(),
            message: message.into(),
        }
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
