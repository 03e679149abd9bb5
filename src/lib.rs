pub mod accounts;
pub mod api;
pub mod auth;
pub mod authorization;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod session;
pub mod views;

use tracing_subscriber::EnvFilter;

pub use error::ClinicError;

/// Initialize tracing from RUST_LOG, falling back to the app default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .init();
}
