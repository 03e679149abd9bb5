//! Company account-administration endpoints.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Actor, DirectoryFilter, NewUser, User};
use crate::{accounts, views};

#[derive(Deserialize, Default)]
pub struct DirectoryParams {
    pub q: Option<String>,
}

/// `GET /api/users`: doctor/patient directory for the company dashboard.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<DirectoryParams>,
) -> Result<Json<views::Directory>, ApiError> {
    let conn = ctx.db()?;
    let filter = DirectoryFilter { query: params.q };
    let directory = views::company_directory(&conn, &actor, &filter)?;
    Ok(Json(directory))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// `POST /api/users`: company creates a doctor or patient account.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Json(new_user): Json<NewUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let conn = ctx.db()?;
    let user = accounts::create_account(&conn, &actor, &new_user)?;
    Ok(Json(UserResponse { user }))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// `DELETE /api/users/{id}`: company deletes a doctor or patient account.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let conn = ctx.db()?;
    accounts::delete_account(&conn, &actor, &id)?;
    Ok(Json(DeletedResponse { deleted: true }))
}
