//! Result and error types for loadgate.

use std::fmt;
use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur in the harness
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No mechanism could install the instrumentation hook
    #[error("Instrumentation attach failed: {message}. Required: {prerequisite}")]
    Attachment {
        /// Error message
        message: String,
        /// The external flag or dependency the user must provide
        prerequisite: String,
    },

    /// A configured transformer unit could not be constructed
    #[error("Transformer '{name}' could not be instantiated: {message}")]
    TransformerInstantiation {
        /// Transformer name as configured
        name: String,
        /// Error message
        message: String,
    },

    /// A transformer unit failed while processing a module
    #[error("Transformer '{transformer}' failed on {class_name}: {source}")]
    Transformation {
        /// Name of the failing unit
        transformer: String,
        /// Module being transformed
        class_name: String,
        /// Original failure
        #[source]
        source: TransformFailure,
    },

    /// The synthetic probe could not be pushed through the pipeline
    #[error("Probe verification failed for {probe}: {message}")]
    ProbeVerification {
        /// Probe class name
        probe: String,
        /// Error message
        message: String,
    },

    /// A protected module was requested before the gate opened
    #[error("Load gate is closed: {class_name} requested before probe verification")]
    GateClosed {
        /// Protected module name
        class_name: String,
    },

    /// Another caller's bootstrap aborted; the session cannot be used
    #[error("Session aborted: {message}")]
    SessionAborted {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Malformed class file
    #[error("Invalid class file: {message}")]
    ClassFormat {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Whether this error must terminate the session.
    ///
    /// Only steady-state transformation failures are reported per module;
    /// everything else means the harness itself cannot be trusted.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transformation { .. })
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a class format error
    #[must_use]
    pub fn class_format(message: impl Into<String>) -> Self {
        Self::ClassFormat {
            message: message.into(),
        }
    }
}

/// Failure reported by a single transformer unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure {
    message: String,
}

impl TransformFailure {
    /// Create a failure with a message
    #[must_use]
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransformFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transformation_is_recoverable() {
        let steady = HarnessError::Transformation {
            transformer: "A".to_string(),
            class_name: "pkg/X".to_string(),
            source: TransformFailure::new("boom"),
        };
        assert!(!steady.is_fatal());

        assert!(HarnessError::GateClosed {
            class_name: "net/minecraft/Entity".to_string(),
        }
        .is_fatal());
        assert!(HarnessError::config("bad").is_fatal());
    }

    #[test]
    fn test_attachment_message_names_prerequisite() {
        let err = HarnessError::Attachment {
            message: "no agent".to_string(),
            prerequisite: "-javaagent:agent.jar".to_string(),
        };
        assert!(err.to_string().contains("-javaagent:agent.jar"));
    }

    #[test]
    fn test_transformation_display_identifies_unit() {
        let err = HarnessError::Transformation {
            transformer: "EntityPatch".to_string(),
            class_name: "net/minecraft/Entity".to_string(),
            source: TransformFailure::new("bad frame"),
        };
        let text = err.to_string();
        assert!(text.contains("EntityPatch"));
        assert!(text.contains("net/minecraft/Entity"));
        assert!(text.contains("bad frame"));
    }
}
