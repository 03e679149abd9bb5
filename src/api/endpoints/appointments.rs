//! Appointment endpoints: booking, role-dispatched listing, transitions.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Actor, Appointment, NewAppointment, RoleKind, Schedule};
use crate::{lifecycle, views};

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

/// `POST /api/appointments`: a patient books a request.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<NewAppointment>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let conn = ctx.db()?;
    let appointment = lifecycle::book(&conn, &actor, &request)?;
    Ok(Json(AppointmentResponse { appointment }))
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    /// Doctor-only: `requests` (default) or `schedule`.
    pub view: Option<String>,
}

/// `GET /api/appointments`: the caller's dashboard view.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ListParams>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let conn = ctx.db()?;
    let appointments = match actor.role {
        RoleKind::Patient => views::patient_appointments(&conn, &actor)?,
        RoleKind::Doctor => match params.view.as_deref() {
            None | Some("requests") => views::doctor_requests(&conn, &actor)?,
            Some("schedule") => views::doctor_schedule(&conn, &actor)?,
            Some(other) => {
                return Err(ApiError::BadRequest(format!("unknown view: {other}")));
            }
        },
        RoleKind::Company => views::company_appointments(&conn, &actor)?,
    };
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `GET /api/appointments/{id}`: single record under visibility rules.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let conn = ctx.db()?;
    let appointment = views::appointment_detail(&conn, &actor, &id)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// Transition request. Schedule fields are only meaningful for `accept`;
/// anywhere else they are rejected outright so the doctor+date+time+location
/// invariant can never be bypassed by a partial update.
#[derive(Deserialize)]
pub struct UpdateRequest {
    pub action: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub location: Option<String>,
}

/// `PUT /api/appointments/{id}`: run one lifecycle transition.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let conn = ctx.db()?;
    let appointment = match req.action.as_str() {
        "accept" => {
            let schedule = Schedule {
                date: req
                    .date
                    .ok_or_else(|| ApiError::BadRequest("accept requires a date".into()))?,
                time: req
                    .time
                    .ok_or_else(|| ApiError::BadRequest("accept requires a time".into()))?,
                location: req
                    .location
                    .ok_or_else(|| ApiError::BadRequest("accept requires a location".into()))?,
            };
            lifecycle::accept(&conn, &actor, &id, &schedule)?
        }
        "reject" | "cancel" | "complete" => {
            if req.date.is_some() || req.time.is_some() || req.location.is_some() {
                return Err(ApiError::BadRequest(
                    "schedule fields are only set by accept".into(),
                ));
            }
            match req.action.as_str() {
                "reject" => lifecycle::reject(&conn, &actor, &id)?,
                "cancel" => lifecycle::cancel(&conn, &actor, &id)?,
                _ => lifecycle::complete(&conn, &actor, &id)?,
            }
        }
        other => {
            return Err(ApiError::BadRequest(format!("unknown action: {other}")));
        }
    };
    Ok(Json(AppointmentResponse { appointment }))
}
