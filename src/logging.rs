use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` when set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "info,answer_scraper=debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
