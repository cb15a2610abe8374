//! Logging setup
//!
//! Installs a process-wide `tracing` subscriber writing to stderr. Library
//! code only emits events; binaries and tests opt in by calling
//! [`init`].

use tracing_subscriber::EnvFilter;

/// Install the subscriber, honoring `RUST_LOG` and defaulting to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with("info");
}

/// Install the subscriber with an explicit default directive, used when
/// `RUST_LOG` is unset.
pub fn init_with(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
