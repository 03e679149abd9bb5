//! HTTP API for the clinic.
//!
//! Exposes the appointment lifecycle, account management, and
//! dashboard views as JSON endpoints. Routes are nested under `/api/`
//! and, apart from register/login, protected by bearer-token auth
//! middleware.
//!
//! The router is composable: `api_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::ApiContext;
