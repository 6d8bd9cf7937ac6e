//! Porter Core - Foundation for the task-execution data-persistence layer
//!
//! Provides the shared error taxonomy, configuration types, and tracing
//! setup used by the storage crates.

pub mod config;
pub mod error;

pub use config::DataConfig;
pub use error::{Error, Result};

/// Initialize tracing for binaries and tests.
///
/// Honors `RUST_LOG`; falls back to info-level output for the porter crates.
/// Safe to call more than once (subsequent calls are no-ops).
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "porter_storage=info,porter_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
