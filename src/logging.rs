//! Tracing setup for applications embedding a store.
//!
//! The library itself only emits `tracing` events; nothing is printed
//! unless the host installs a subscriber, either its own or the one built
//! here.

use std::fs::OpenOptions;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StoreConfig;

/// Environment variable naming a log file. Unset means stderr.
pub const LOG_ENV_VAR: &str = "STATEHIVE_LOG";

/// Filter used when `RUST_LOG` is not set.
///
/// `trace_mutations` emits commit events at debug level, so it raises the
/// crate's default level to match.
pub fn default_directive(config: &StoreConfig) -> &'static str {
    if config.trace_mutations {
        "statehive=debug"
    } else {
        "statehive=info"
    }
}

/// Installs a global fmt subscriber.
///
/// Output goes to the file named by `STATEHIVE_LOG` (appended to) or to
/// stderr. Returns false if a global subscriber was already installed.
pub fn init_tracing(config: &StoreConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    if let Ok(log_path) = std::env::var(LOG_ENV_VAR) {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true);
                return tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .try_init()
                    .is_ok();
            }
            Err(e) => eprintln!("Warning: Failed to open log file {}: {}", log_path, e),
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .is_ok()
}
