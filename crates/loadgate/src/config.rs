//! Harness configuration.

use crate::gate::DEFAULT_PROTECTED_PREFIXES;
use crate::probe::DEFAULT_PROBE_NAME;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`HarnessConfig::remap_path`]
pub const REMAP_PATH_ENV: &str = "LOADGATE_SRG_MCP";

/// Mapping file location when nothing else is configured
pub const DEFAULT_REMAP_PATH: &str = "./build/createSrgToMcp/output.srg";

/// Which physical side the mixin environment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Client side
    #[default]
    Client,
    /// Dedicated server side
    Server,
}

impl Side {
    /// Lowercase name, as used in configuration and launch data
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

/// Configuration for a harness session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Exclusion prefixes added after the baseline
    pub extra_exclusions: Vec<String>,
    /// Prefixes withheld until the probe passes
    pub protected_prefixes: Vec<String>,
    /// Transformer names resolved through the catalog, after the provider's
    pub transformers: Vec<String>,
    /// SRG mapping file
    pub remap_path: Option<PathBuf>,
    /// Probe class name
    pub probe_name: String,
    /// Target side
    pub side: Side,
    /// Try installing an agent when none is attached
    pub self_attach: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            extra_exclusions: Vec::new(),
            protected_prefixes: DEFAULT_PROTECTED_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            transformers: Vec::new(),
            remap_path: None,
            probe_name: DEFAULT_PROBE_NAME.to_string(),
            side: Side::Client,
            self_attach: true,
        }
    }
}

impl HarnessConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exclusion prefix
    #[must_use]
    pub fn with_exclusion(mut self, prefix: impl Into<String>) -> Self {
        self.extra_exclusions.push(prefix.into());
        self
    }

    /// Replace the protected prefixes
    #[must_use]
    pub fn with_protected_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Add a transformer name
    #[must_use]
    pub fn with_transformer(mut self, name: impl Into<String>) -> Self {
        self.transformers.push(name.into());
        self
    }

    /// Set the mapping file
    #[must_use]
    pub fn with_remap_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.remap_path = Some(path.into());
        self
    }

    /// Set the probe name
    #[must_use]
    pub fn with_probe_name(mut self, name: impl Into<String>) -> Self {
        self.probe_name = name.into();
        self
    }

    /// Set the target side
    #[must_use]
    pub const fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Enable or disable the self-attach fallback
    #[must_use]
    pub const fn with_self_attach(mut self, enabled: bool) -> Self {
        self.self_attach = enabled;
        self
    }

    /// Parse YAML.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid YAML or a configuration that fails
    /// [`HarnessConfig::validate`].
    pub fn from_yaml_str(text: &str) -> HarnessResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid JSON or a configuration that fails
    /// [`HarnessConfig::validate`].
    pub fn from_json_str(text: &str) -> HarnessResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Serialize as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> HarnessResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check the configuration for values the harness cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] describing the first problem.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.probe_name.is_empty() {
            return Err(HarnessError::config("probe_name must not be empty"));
        }
        if self.probe_name.contains('.')
            || self.probe_name.starts_with('/')
            || self.probe_name.ends_with('/')
        {
            return Err(HarnessError::config(format!(
                "probe_name '{}' must be an internal class name like pkg/Name",
                self.probe_name
            )));
        }
        if let Some(prefix) = self
            .extra_exclusions
            .iter()
            .chain(&self.protected_prefixes)
            .find(|p| p.trim().is_empty())
        {
            return Err(HarnessError::config(format!(
                "empty prefix '{prefix}' would match every class"
            )));
        }
        if let Some(name) = self.transformers.iter().find(|t| t.trim().is_empty()) {
            return Err(HarnessError::config(format!(
                "transformer name '{name}' is blank"
            )));
        }
        Ok(())
    }

    /// Mapping file to load: environment override, then config, then default
    #[must_use]
    pub fn resolved_remap_path(&self) -> PathBuf {
        std::env::var_os(REMAP_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.remap_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REMAP_PATH))
    }
}
