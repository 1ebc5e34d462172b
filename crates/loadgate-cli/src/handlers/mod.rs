//! Command handlers - kept out of main.rs for testability
//!
//! Handlers return what should be printed; main.rs does the printing.

pub mod config;
pub mod inspect;
pub mod probe;
pub mod verify;

pub use config::{execute_config, load_config};
pub use inspect::{execute_inspect, render_header};
pub use probe::{default_output_path, execute_probe};
pub use verify::{builtin_catalog, execute_verify, VerifyOutcome};
