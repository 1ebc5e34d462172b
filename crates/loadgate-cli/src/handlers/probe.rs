//! Probe command handler

use crate::{CliError, CliResult, ProbeArgs};
use loadgate::{build_probe_class, normalize_name};
use std::path::PathBuf;

/// `<simple name>.class` in the working directory
#[must_use]
pub fn default_output_path(name: &str) -> PathBuf {
    let simple = name.rsplit(['/', '.']).next().unwrap_or(name);
    PathBuf::from(format!("{simple}.class"))
}

/// Execute the probe command. Returns the path written.
pub fn execute_probe(args: &ProbeArgs) -> CliResult<PathBuf> {
    let name = normalize_name(&args.name);
    if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
        return Err(CliError::invalid_argument(format!(
            "'{}' is not a class name",
            args.name
        )));
    }

    let bytes = build_probe_class(&name)?;
    let path = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path(&name));
    std::fs::write(&path, &bytes)?;
    tracing::info!(probe = %name, path = %path.display(), bytes = bytes.len(), "Probe written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgate::ClassHeader;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("loadgate_synthetic/Probe$0"),
            PathBuf::from("Probe$0.class")
        );
        assert_eq!(default_output_path("Top"), PathBuf::from("Top.class"));
    }

    #[test]
    fn test_writes_parseable_class() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("p.class");
        let written = execute_probe(&ProbeArgs {
            name: "my.pkg.Probe".to_string(),
            out: Some(out.clone()),
        })
        .unwrap();
        assert_eq!(written, out);

        let header = ClassHeader::parse(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(header.this_class, "my/pkg/Probe");
    }

    #[test]
    fn test_rejects_bad_names() {
        for name in ["", "pkg/", "/Probe"] {
            let args = ProbeArgs {
                name: name.to_string(),
                out: None,
            };
            assert!(matches!(
                execute_probe(&args),
                Err(CliError::InvalidArgument { .. })
            ));
        }
    }
}
