use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "CitaSalud";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "citasalud=info,tower_http=info";

/// Get the application data directory
/// ~/CitaSalud/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("CitaSalud")
}

/// Path to the clinic database, overridable via CITASALUD_DB
pub fn database_path() -> PathBuf {
    match std::env::var_os("CITASALUD_DB") {
        Some(path) => PathBuf::from(path),
        None => app_data_dir().join("clinic.db"),
    }
}

/// Address the HTTP server binds to, overridable via CITASALUD_ADDR
pub fn bind_addr() -> SocketAddr {
    std::env::var("CITASALUD_ADDR")
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 5000)))
}
