//! Log setup for the `tt` binary.
//!
//! Events go to stderr so they never mix with command output or `--json`.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "TASKTREE_LOG";

/// Install the global subscriber. `TASKTREE_LOG` wins over `default_filter`;
/// an unparsable filter falls back to `warn`. Safe to call more than once.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
