//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Loadgate: build, inspect and verify the class-load probe
#[derive(Parser, Debug)]
#[command(name = "loadgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the synthesized probe class
    Probe(ProbeArgs),

    /// Print the header of a class file
    Inspect(InspectArgs),

    /// Run a full bootstrap against the in-process runtime
    Verify(VerifyArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the probe command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Probe class name (internal form, e.g. pkg/Name)
    #[arg(short, long, default_value = loadgate::DEFAULT_PROBE_NAME)]
    pub name: String,

    /// Output file (defaults to <simple name>.class)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Class file to read
    pub file: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the verify command
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Configuration file (YAML, or JSON by extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SRG mapping file
    #[arg(short, long)]
    pub remap: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration file (YAML, or JSON by extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verify_parses() {
        let cli = Cli::try_parse_from(["loadgate", "-vv", "verify", "--remap", "m.srg"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.remap, Some(PathBuf::from("m.srg")));
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_probe_defaults() {
        let cli = Cli::try_parse_from(["loadgate", "probe"]).unwrap();
        match cli.command {
            Commands::Probe(args) => {
                assert_eq!(args.name, loadgate::DEFAULT_PROBE_NAME);
                assert!(args.out.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_inspect_requires_file() {
        assert!(Cli::try_parse_from(["loadgate", "inspect"]).is_err());
    }

    #[test]
    fn test_quiet_is_global() {
        let cli = Cli::try_parse_from(["loadgate", "config", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
