//! Loadgate CLI: class-load probe tooling
//!
//! ## Usage
//!
//! ```bash
//! loadgate probe --out Probe.class     # Write the synthetic probe
//! loadgate inspect Probe.class --json  # Dump a class header
//! loadgate verify --config harness.yaml
//! loadgate config                      # Show effective configuration
//! ```

use clap::Parser;
use loadgate::{logging, Verbosity};
use loadgate_cli::{handlers, Cli, CliResult, Commands};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_count(cli.verbose, cli.quiet);
    if cli.log_json {
        logging::init_json(verbosity);
    } else {
        logging::init(verbosity);
    }

    match cli.command {
        Commands::Probe(args) => {
            let path = handlers::execute_probe(&args)?;
            if verbosity != Verbosity::Quiet {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Inspect(args) => {
            print!("{}", handlers::execute_inspect(&args)?);
            Ok(())
        }
        Commands::Verify(args) => {
            let outcome = handlers::execute_verify(&args)?;
            println!("{}", outcome.report);
            if verbosity != Verbosity::Quiet {
                eprintln!("bootstrap took {} ms", outcome.total_duration_ms);
            }
            outcome.into_result().map(|_| ())
        }
        Commands::Config(args) => {
            print!("{}", handlers::execute_config(&args)?);
            Ok(())
        }
    }
}
