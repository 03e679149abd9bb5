//! Row-mapping CRUD for users and appointments.
//!
//! All write paths that transition appointment status go through a single
//! conditional UPDATE (`WHERE status = <expected>`); the changed-row count
//! decides `Applied` vs `Conflict`. This is the only guard the accept race
//! needs, never read-then-write.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::enums::{AppointmentStatus, CancelledBy, RoleKind};
use crate::models::{Appointment, Role, Schedule, User};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Outcome of an atomic conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The precondition held and the patch was applied.
    Applied,
    /// The row's current state no longer matches the precondition; no
    /// partial effect.
    Conflict,
}

// ═══════════════════════════════════════════
// User repository
// ═══════════════════════════════════════════

pub fn insert_user(
    conn: &Connection,
    user: &User,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    let (specialty, company_name) = match &user.role {
        Role::Patient => (None, None),
        Role::Doctor { specialty } => (Some(specialty.as_str()), None),
        Role::Company { company_name } => (None, Some(company_name.as_str())),
    };

    conn.execute(
        "INSERT INTO users (id, first_name, last_name, national_id, email, phone,
         role, specialty, company_name, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id.to_string(),
            user.first_name,
            user.last_name,
            user.national_id,
            user.email,
            user.phone,
            user.role.kind().as_str(),
            specialty,
            company_name,
            password_hash,
            user.created_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

const USER_COLUMNS: &str = "id, first_name, last_name, national_id, email, phone,
     role, specialty, company_name, created_at";

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], user_row);
    match result {
        Ok(row) => Ok(Some(user_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fetch a user plus their stored password hash, for credential checks.
pub fn find_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<(User, String)>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
    ))?;

    let result = stmt.query_row(params![email], |row| {
        Ok((user_row(row)?, row.get::<_, String>(10)?))
    });
    match result {
        Ok((row, hash)) => Ok(Some((user_from_row(row)?, hash))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn national_id_exists(conn: &Connection, national_id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE national_id = ?1",
        params![national_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY last_name ASC, first_name ASC"
    ))?;

    let rows = stmt.query_map([], user_row)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(user_from_row(row?)?);
    }
    Ok(users)
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for User mapping
struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    national_id: String,
    email: String,
    phone: String,
    role: String,
    specialty: Option<String>,
    company_name: Option<String>,
    created_at: String,
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        national_id: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        role: row.get(6)?,
        specialty: row.get(7)?,
        company_name: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let kind = RoleKind::from_str(&row.role)?;
    let role = match kind {
        RoleKind::Patient => Role::Patient,
        RoleKind::Doctor => Role::Doctor {
            specialty: row.specialty.unwrap_or_default(),
        },
        RoleKind::Company => Role::Company {
            company_name: row.company_name.unwrap_or_default(),
        },
    };

    Ok(User {
        id: parse_uuid(&row.id, "users.id")?,
        first_name: row.first_name,
        last_name: row.last_name,
        national_id: row.national_id,
        email: row.email,
        phone: row.phone,
        role,
        created_at: parse_datetime(&row.created_at, "users.created_at")?,
    })
}

// ═══════════════════════════════════════════
// Appointment repository
// ═══════════════════════════════════════════

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, service_type, date, time,
         location, notes, paid, status, cancelled_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.map(|id| id.to_string()),
            appt.service_type,
            appt.date.map(|d| d.to_string()),
            appt.time,
            appt.location,
            appt.notes,
            appt.paid as i32,
            appt.status.as_str(),
            appt.cancelled_by.map(|c| c.as_str()),
            appt.created_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, service_type, date, time,
     location, notes, paid, status, cancelled_by, created_at";

pub fn get_appointment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], appointment_row);
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All appointments belonging to one patient, newest first.
pub fn list_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE patient_id = ?1 ORDER BY created_at DESC"
        ),
        params![patient_id.to_string()],
    )
}

/// The doctors' shared request queue: every pending appointment.
pub fn list_pending_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE status = 'pending' ORDER BY created_at ASC"
        ),
        params![],
    )
}

/// Confirmed appointments claimed by one doctor, soonest first.
pub fn list_confirmed_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE status = 'confirmed' AND doctor_id = ?1
             ORDER BY date ASC, time ASC"
        ),
        params![doctor_id.to_string()],
    )
}

pub fn list_all_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY created_at DESC"
        ),
        params![],
    )
}

fn query_appointments(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, appointment_row)?;
    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

/// Atomic claim: assign the doctor and schedule in one conditional UPDATE.
///
/// Succeeds only while the row is still pending, so two concurrent accepts
/// can never both win and the loser never overwrites the winner's data.
pub fn claim_appointment(
    conn: &Connection,
    id: &Uuid,
    doctor_id: &Uuid,
    schedule: &Schedule,
) -> Result<CasOutcome, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET doctor_id = ?1, date = ?2, time = ?3, location = ?4, status = 'confirmed'
         WHERE id = ?5 AND status = 'pending'",
        params![
            doctor_id.to_string(),
            schedule.date.to_string(),
            schedule.time,
            schedule.location,
            id.to_string(),
        ],
    )?;
    Ok(if changed == 1 { CasOutcome::Applied } else { CasOutcome::Conflict })
}

/// Conditional status transition with the same CAS shape as the claim.
///
/// `require_doctor` additionally pins the assigned doctor (used by
/// mark-complete so only the claiming doctor can finish the visit).
pub fn transition_status(
    conn: &Connection,
    id: &Uuid,
    expected: AppointmentStatus,
    next: AppointmentStatus,
    cancelled_by: Option<CancelledBy>,
    require_doctor: Option<&Uuid>,
) -> Result<CasOutcome, DatabaseError> {
    let changed = match require_doctor {
        Some(doctor_id) => conn.execute(
            "UPDATE appointments SET status = ?1, cancelled_by = ?2
             WHERE id = ?3 AND status = ?4 AND doctor_id = ?5",
            params![
                next.as_str(),
                cancelled_by.map(|c| c.as_str()),
                id.to_string(),
                expected.as_str(),
                doctor_id.to_string(),
            ],
        )?,
        None => conn.execute(
            "UPDATE appointments SET status = ?1, cancelled_by = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                next.as_str(),
                cancelled_by.map(|c| c.as_str()),
                id.to_string(),
                expected.as_str(),
            ],
        )?,
    };
    Ok(if changed == 1 { CasOutcome::Applied } else { CasOutcome::Conflict })
}

/// Administrative escape hatch only; normal operation never deletes.
pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: String,
    patient_id: String,
    doctor_id: Option<String>,
    service_type: String,
    date: Option<String>,
    time: Option<String>,
    location: Option<String>,
    notes: Option<String>,
    paid: i32,
    status: String,
    cancelled_by: Option<String>,
    created_at: String,
}

fn appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        service_type: row.get(3)?,
        date: row.get(4)?,
        time: row.get(5)?,
        location: row.get(6)?,
        notes: row.get(7)?,
        paid: row.get(8)?,
        status: row.get(9)?,
        cancelled_by: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id, "appointments.id")?,
        patient_id: parse_uuid(&row.patient_id, "appointments.patient_id")?,
        doctor_id: row
            .doctor_id
            .map(|id| parse_uuid(&id, "appointments.doctor_id"))
            .transpose()?,
        service_type: row.service_type,
        date: row
            .date
            .map(|d| parse_date(&d, "appointments.date"))
            .transpose()?,
        time: row.time,
        location: row.location,
        notes: row.notes,
        paid: row.paid != 0,
        status: AppointmentStatus::from_str(&row.status)?,
        cancelled_by: row
            .cancelled_by
            .map(|c| CancelledBy::from_str(&c))
            .transpose()?,
        created_at: parse_datetime(&row.created_at, "appointments.created_at")?,
    })
}

// ═══════════════════════════════════════════
// Field parsing helpers
// ═══════════════════════════════════════════

fn parse_uuid(s: &str, field: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|_| DatabaseError::InvalidEnum {
        field: field.into(),
        value: s.into(),
    })
}

fn parse_date(s: &str, field: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| DatabaseError::InvalidEnum {
        field: field.into(),
        value: s.into(),
    })
}

fn parse_datetime(s: &str, field: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|_| DatabaseError::InvalidEnum {
        field: field.into(),
        value: s.into(),
    })
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
