//! Config command handler

use crate::{CliResult, ConfigArgs};
use loadgate::HarnessConfig;
use std::path::Path;

/// Load a configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> CliResult<HarnessConfig> {
    let config = match path {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    tracing::debug!(source = ?path, "Configuration loaded");
    Ok(config)
}

/// Execute the config command: the effective configuration as YAML
pub fn execute_config(args: &ConfigArgs) -> CliResult<String> {
    let config = load_config(args.config.as_deref())?;
    let mut out = config.to_yaml()?;
    out.push_str(&format!(
        "# remap file in effect: {}\n",
        config.resolved_remap_path().display()
    ));
    Ok(out)
}
