//! Verify command handler
//!
//! Runs a complete bootstrap against [`LocalRuntime`] and returns the
//! report as JSON. Transformer names in the configuration resolve against
//! [`builtin_catalog`].

use crate::handlers::config::load_config;
use crate::{CliError, CliResult, VerifyArgs};
use loadgate::{
    ClassHeader, ClassTransformer, FnTransformer, LocalRuntime, SessionBootstrap,
    TransformFailure, TransformerCatalog,
};
use std::sync::Arc;

/// Transformers available to `verify`
///
/// - `identity` returns its input.
/// - `class-check` fails on bytes that do not parse as a class.
#[must_use]
pub fn builtin_catalog() -> TransformerCatalog {
    TransformerCatalog::new()
        .with("identity", || {
            Ok(Arc::new(FnTransformer::new("identity", |_, _, bytes| Ok(bytes)))
                as Arc<dyn ClassTransformer>)
        })
        .with("class-check", || {
            Ok(Arc::new(FnTransformer::new("class-check", |name, _, bytes| {
                let header = ClassHeader::parse(&bytes).map_err(TransformFailure::new)?;
                if header.this_class != name {
                    return Err(TransformFailure::new(format!(
                        "bytes declare {}",
                        header.this_class
                    )));
                }
                Ok(bytes)
            })) as Arc<dyn ClassTransformer>)
        })
}

/// Result of a verify run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// Bootstrap report as pretty JSON
    pub report: String,
    /// Why the session did not become ready, if it did not
    pub failure: Option<String>,
    /// Time spent across all bootstrap steps
    pub total_duration_ms: u64,
}

impl VerifyOutcome {
    /// Whether the session reached the ready state
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.failure.is_none()
    }

    /// Turn a failed run into an error
    pub fn into_result(self) -> CliResult<String> {
        match self.failure {
            None => Ok(self.report),
            Some(message) => Err(CliError::verification(message)),
        }
    }
}

/// Execute the verify command.
///
/// A bootstrap that aborts still produces a report; only configuration
/// and rendering problems are returned as errors.
pub fn execute_verify(args: &VerifyArgs) -> CliResult<VerifyOutcome> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(remap) = &args.remap {
        config = config.with_remap_path(remap);
    }

    let session = SessionBootstrap::builder(config)
        .host_agent(Arc::new(LocalRuntime::new()))
        .catalog(builtin_catalog())
        .build()?;

    let failure = session.ensure_ready().err().map(|e| e.to_string());
    let report = session
        .report()
        .ok_or_else(|| CliError::verification("no report produced"))?;

    let total_duration_ms = report.total_duration_ms();
    tracing::info!(
        session = %report.session_id,
        steps = report.steps.len(),
        total_ms = total_duration_ms,
        ready = failure.is_none(),
        "Verification finished"
    );

    Ok(VerifyOutcome {
        report: report.to_json()?,
        failure,
        total_duration_ms,
    })
}
