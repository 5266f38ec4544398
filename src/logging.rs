//! Logging configuration using tracing
//!
//! Log lines go to stderr. `RUST_LOG` overrides the default level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Defaults to `info`; `verbose` raises the crate to `debug`, which logs every
/// command (`C:`) and reply (`S:`) per session.
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init(verbose: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(verbose),
        )
        .try_init()
}

/// Filter used when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("info,mboxd=debug")
    } else {
        EnvFilter::new("info")
    }
}
