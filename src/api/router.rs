//! API router.
//!
//! Composable `Router` with all endpoints under `/api/`. Register and
//! login are open; everything else sits behind the bearer-token auth
//! middleware, which injects the `Actor` every handler works from.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        .route(
            "/appointments",
            post(endpoints::appointments::book).get(endpoints::appointments::list),
        )
        .route("/appointments/:id", get(endpoints::appointments::detail))
        .route("/appointments/:id", put(endpoints::appointments::update))
        .route(
            "/users",
            get(endpoints::users::list).post(endpoints::users::create),
        )
        .route("/users/:id", delete(endpoints::users::delete))
        .route("/auth/logout", post(endpoints::auth::logout))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so the middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx);

    Router::new().nest("/api", protected.merge(unprotected))
}
