//! Logger setup.
//!
//! Verbosity derives from the `TRACE` environment variable (0 → warn,
//! 1 → info, 2 → debug), memoised on first access; `-v`/`-q` flags
//! override it. Initialisation happens once per process.

use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static TRACE_LEVEL: OnceLock<u8> = OnceLock::new();

/// The `TRACE` level, read from the environment once and then fixed for
/// the process lifetime.
#[must_use]
pub fn trace_level() -> u8 {
    *TRACE_LEVEL.get_or_init(|| {
        std::env::var("TRACE")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    })
}

/// Initialise tracing from flags and the `TRACE` convention.
pub fn init(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose > 0 {
        match verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    } else {
        match trace_level() {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
