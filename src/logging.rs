//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is
//! left to the binary so embedding applications keep control of output.

use tracing_subscriber::EnvFilter;

/// Filter used with `--verbose` when `RUST_LOG` is unset.
const VERBOSE_FILTER: &str = "vos_shell=debug";

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";

/// Returns the filter directive for the given verbosity.
#[must_use]
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }
}

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over
/// `verbose`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(verbose: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
