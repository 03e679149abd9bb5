//! Registration, login, and logout.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Actor, NewUser, RoleKind, User};
use crate::{accounts, auth};

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// `POST /api/auth/register`: self-service registration.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(new_user): Json<NewUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let conn = ctx.db()?;
    let user = accounts::register(&conn, &new_user)?;
    Ok(Json(UserResponse { user }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: RoleKind,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `POST /api/auth/login`: verify credentials, mint a session token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = {
        let conn = ctx.db()?;
        auth::verify_credentials(&conn, &req.email, &req.password, req.role)
            .map_err(|_| ApiError::Unauthorized)?
    };

    let actor = Actor { id: user.id, role: user.role.kind() };
    let token = ctx.sessions.issue(actor);
    Ok(Json(LoginResponse { token, user }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// `POST /api/auth/logout`: revoke the presented token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    if let Some(token) = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        ctx.sessions.revoke(token);
    }
    Ok(Json(LogoutResponse { logged_out: true }))
}
