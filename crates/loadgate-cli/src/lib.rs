//! Loadgate CLI library
//!
//! Command-line entry points for the loadgate harness: write and inspect
//! probe classes, and run a full bootstrap against the in-process runtime.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod error;
pub mod handlers;

pub use commands::{Cli, Commands, ConfigArgs, InspectArgs, ProbeArgs, VerifyArgs};
pub use error::{CliError, CliResult};
