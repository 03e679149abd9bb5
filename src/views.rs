//! Dashboard query views.
//!
//! Read-only projections over the current appointment set, recomputed on
//! each query. Every view enforces the read rules of the authorization
//! policy; a denied single-record read surfaces as `NotFound`.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::authorization::check_appointment_read;
use crate::db::repository;
use crate::error::ClinicError;
use crate::models::{Actor, Appointment, DirectoryFilter, Role, RoleKind, User};

/// A patient's own appointments, any status, newest first.
pub fn patient_appointments(
    conn: &Connection,
    actor: &Actor,
) -> Result<Vec<Appointment>, ClinicError> {
    if actor.role != RoleKind::Patient {
        return Err(ClinicError::Authorization);
    }
    Ok(repository::list_appointments_for_patient(conn, &actor.id)?)
}

/// The shared request queue every doctor works from: pending only.
pub fn doctor_requests(conn: &Connection, actor: &Actor) -> Result<Vec<Appointment>, ClinicError> {
    if actor.role != RoleKind::Doctor {
        return Err(ClinicError::Authorization);
    }
    Ok(repository::list_pending_appointments(conn)?)
}

/// A doctor's own confirmed schedule.
pub fn doctor_schedule(conn: &Connection, actor: &Actor) -> Result<Vec<Appointment>, ClinicError> {
    if actor.role != RoleKind::Doctor {
        return Err(ClinicError::Authorization);
    }
    Ok(repository::list_confirmed_for_doctor(conn, &actor.id)?)
}

/// Company oversight: the full appointment roster.
pub fn company_appointments(
    conn: &Connection,
    actor: &Actor,
) -> Result<Vec<Appointment>, ClinicError> {
    if actor.role != RoleKind::Company {
        return Err(ClinicError::Authorization);
    }
    Ok(repository::list_all_appointments(conn)?)
}

/// Single-record read under the visibility rules. Denied reads are
/// indistinguishable from absent records.
pub fn appointment_detail(
    conn: &Connection,
    actor: &Actor,
    id: &Uuid,
) -> Result<Appointment, ClinicError> {
    let appt = repository::get_appointment(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment", id))?;
    if !check_appointment_read(actor, &appt).allowed {
        return Err(ClinicError::not_found("Appointment", id));
    }
    Ok(appt)
}

/// User directory for the company dashboard, partitioned by role.
#[derive(Debug, Serialize)]
pub struct Directory {
    pub doctors: Vec<User>,
    pub patients: Vec<User>,
}

/// All doctor and patient accounts, optionally narrowed by a
/// case-insensitive substring over name, email, and specialty.
pub fn company_directory(
    conn: &Connection,
    actor: &Actor,
    filter: &DirectoryFilter,
) -> Result<Directory, ClinicError> {
    if actor.role != RoleKind::Company {
        return Err(ClinicError::Authorization);
    }

    let mut doctors = Vec::new();
    let mut patients = Vec::new();
    for user in repository::list_users(conn)? {
        let full_name = format!("{} {}", user.first_name, user.last_name);
        match &user.role {
            Role::Doctor { specialty } => {
                if filter.matches(&[&full_name, &user.email, specialty]) {
                    doctors.push(user);
                }
            }
            Role::Patient => {
                if filter.matches(&[&full_name, &user.email]) {
                    patients.push(user);
                }
            }
            Role::Company { .. } => {}
        }
    }

    Ok(Directory { doctors, patients })
}
