//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Default filter when `NEARDUP_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str =
    "neardup=info,neardup_core=info,neardup_engine=info,neardup_storage=info";

/// Initialize the neardup tracing/logging system.
///
/// Reads the `NEARDUP_LOG` environment variable for per-crate log levels.
/// Format: `NEARDUP_LOG=neardup_engine=debug,neardup_storage=warn`
///
/// Falls back to `DEFAULT_FILTER` if `NEARDUP_LOG` is not set or is invalid.
///
/// This function is idempotent: calling it multiple times is safe.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("NEARDUP_LOG")
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}

/// Initialize with an explicit filter directive, ignoring `NEARDUP_LOG`.
/// Used by the CLI `--log-level` flag. Also idempotent, and a no-op after
/// `init_tracing` has already run.
pub fn init_tracing_with(directive: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .try_init();
    });
}
