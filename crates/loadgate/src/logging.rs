//! Log subscriber setup.
//!
//! `RUST_LOG` takes precedence over the verbosity passed in. Both
//! initializers are no-ops if a global subscriber is already installed.

use tracing_subscriber::EnvFilter;

/// How much the harness should log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Warnings and lifecycle events
    #[default]
    Normal,
    /// Per-step detail
    Verbose,
    /// Per-class detail
    Debug,
}

impl Verbosity {
    /// Map a `-v` count to a level
    #[must_use]
    pub const fn from_count(count: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Default filter directive for this level
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn,loadgate=info",
            Self::Verbose => "info,loadgate=debug",
            Self::Debug => "debug,loadgate=trace",
        }
    }
}

fn filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}

/// Install a human-readable subscriber writing to stderr.
///
/// Returns `false` if another subscriber was already installed.
pub fn init(verbosity: Verbosity) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber writing to stderr.
///
/// Returns `false` if another subscriber was already installed.
pub fn init_json(verbosity: Verbosity) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
