//! Appointment lifecycle state machine.
//!
//! ```text
//!          book (patient)
//!               │
//!            pending ──accept (doctor, CAS)──▶ confirmed
//!               │  │                              │  │
//!   reject ─────┘  └───── cancel (patient)        │  └── complete (assigned doctor)
//!   (doctor)                  │                   │
//!               ▼             ▼                   ▼
//!           cancelled     cancelled           cancelled ◀── cancel (patient)
//! ```
//!
//! `cancelled` and `completed` are terminal. The accept transition is the
//! only one where "who gets there first" matters; it is a single atomic
//! conditional update, and the loser gets `StaleState`, never a silent
//! overwrite of the winner's assignment.

use chrono::NaiveTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository;
use crate::db::repository::CasOutcome;
use crate::error::ClinicError;
use crate::models::{
    Actor, Appointment, AppointmentStatus, CancelledBy, NewAppointment, RoleKind, Schedule,
};

/// A patient books a new appointment request.
///
/// Payment precedes confirmation by product decision: the paid flag is set
/// at creation, independent of whether a doctor later accepts.
pub fn book(
    conn: &Connection,
    actor: &Actor,
    request: &NewAppointment,
) -> Result<Appointment, ClinicError> {
    if actor.role != RoleKind::Patient {
        return Err(ClinicError::Authorization);
    }
    if request.service_type.trim().is_empty() {
        return Err(ClinicError::validation("service type is required"));
    }

    let appt = Appointment {
        id: Uuid::new_v4(),
        patient_id: actor.id,
        doctor_id: None,
        service_type: request.service_type.trim().to_string(),
        date: None,
        time: None,
        location: None,
        notes: request.notes.clone(),
        paid: true,
        status: AppointmentStatus::Pending,
        cancelled_by: None,
        created_at: chrono::Local::now().naive_local(),
    };
    repository::insert_appointment(conn, &appt)?;

    tracing::info!(appointment_id = %appt.id, patient_id = %actor.id, "appointment booked");
    Ok(appt)
}

/// A doctor claims a pending request, scheduling it in the same step.
///
/// Doctor, date, time, and location are set together or not at all. If the
/// conditional update loses a race (or the request was already claimed by
/// the time this doctor acted), the result is `StaleState`; a terminal
/// appointment yields `InvalidTransition`.
pub fn accept(
    conn: &Connection,
    actor: &Actor,
    id: &Uuid,
    schedule: &Schedule,
) -> Result<Appointment, ClinicError> {
    if actor.role != RoleKind::Doctor {
        return Err(ClinicError::Authorization);
    }
    validate_schedule(schedule)?;

    // Existence check only; the status precondition lives in the UPDATE
    // itself, so a stale read here cannot cause a lost update.
    let _ = fetch(conn, id)?;

    match repository::claim_appointment(conn, id, &actor.id, schedule)? {
        CasOutcome::Applied => {
            tracing::info!(appointment_id = %id, doctor_id = %actor.id, "appointment claimed");
            fetch(conn, id)
        }
        CasOutcome::Conflict => {
            let current = fetch(conn, id)?.status;
            if current == AppointmentStatus::Confirmed {
                Err(ClinicError::StaleState)
            } else {
                Err(ClinicError::InvalidTransition { current })
            }
        }
    }
}

/// A doctor declines a pending request. The doctor reference stays unset;
/// `cancelled_by` records that a doctor (not the patient) ended it.
pub fn reject(conn: &Connection, actor: &Actor, id: &Uuid) -> Result<Appointment, ClinicError> {
    if actor.role != RoleKind::Doctor {
        return Err(ClinicError::Authorization);
    }

    let appt = fetch(conn, id)?;
    if appt.status != AppointmentStatus::Pending {
        // Acting on a claimed or finished appointment is only ever an
        // illegal transition for the assigned doctor; anyone else simply
        // lacks the right to touch it.
        return if appt.doctor_id == Some(actor.id) {
            Err(ClinicError::InvalidTransition { current: appt.status })
        } else {
            Err(ClinicError::Authorization)
        };
    }

    match repository::transition_status(
        conn,
        id,
        AppointmentStatus::Pending,
        AppointmentStatus::Cancelled,
        Some(CancelledBy::Doctor),
        None,
    )? {
        CasOutcome::Applied => {
            tracing::info!(appointment_id = %id, doctor_id = %actor.id, "appointment rejected");
            fetch(conn, id)
        }
        CasOutcome::Conflict => {
            let current = fetch(conn, id)?.status;
            if current == AppointmentStatus::Confirmed {
                Err(ClinicError::StaleState)
            } else {
                Err(ClinicError::InvalidTransition { current })
            }
        }
    }
}

/// The owning patient cancels, from pending or confirmed.
pub fn cancel(conn: &Connection, actor: &Actor, id: &Uuid) -> Result<Appointment, ClinicError> {
    if actor.role != RoleKind::Patient {
        return Err(ClinicError::Authorization);
    }

    let appt = fetch(conn, id)?;
    if appt.patient_id != actor.id {
        // Not visible to this patient; deny without leaking existence.
        return Err(ClinicError::not_found("Appointment", id));
    }

    // Cancel is legal from pending and from confirmed, so a lost race with
    // a concurrent accept just moves the expected status forward once.
    let mut expected = appt.status;
    for _ in 0..2 {
        if expected.is_terminal() {
            return Err(ClinicError::InvalidTransition { current: expected });
        }
        match repository::transition_status(
            conn,
            id,
            expected,
            AppointmentStatus::Cancelled,
            Some(CancelledBy::Patient),
            None,
        )? {
            CasOutcome::Applied => {
                tracing::info!(appointment_id = %id, patient_id = %actor.id, "appointment cancelled");
                return fetch(conn, id);
            }
            CasOutcome::Conflict => {
                expected = fetch(conn, id)?.status;
            }
        }
    }
    Err(ClinicError::InvalidTransition { current: expected })
}

/// The assigned doctor marks a confirmed appointment completed.
pub fn complete(conn: &Connection, actor: &Actor, id: &Uuid) -> Result<Appointment, ClinicError> {
    if actor.role != RoleKind::Doctor {
        return Err(ClinicError::Authorization);
    }

    let appt = fetch(conn, id)?;
    match appt.status {
        AppointmentStatus::Confirmed => {
            if appt.doctor_id != Some(actor.id) {
                return Err(ClinicError::Authorization);
            }
        }
        AppointmentStatus::Pending => {
            return Err(ClinicError::InvalidTransition { current: appt.status });
        }
        _ => {
            return if appt.doctor_id == Some(actor.id) {
                Err(ClinicError::InvalidTransition { current: appt.status })
            } else {
                Err(ClinicError::Authorization)
            };
        }
    }

    match repository::transition_status(
        conn,
        id,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        None,
        Some(&actor.id),
    )? {
        CasOutcome::Applied => {
            tracing::info!(appointment_id = %id, doctor_id = %actor.id, "appointment completed");
            fetch(conn, id)
        }
        CasOutcome::Conflict => {
            let current = fetch(conn, id)?.status;
            Err(ClinicError::InvalidTransition { current })
        }
    }
}

fn fetch(conn: &Connection, id: &Uuid) -> Result<Appointment, ClinicError> {
    repository::get_appointment(conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment", id))
}

fn validate_schedule(schedule: &Schedule) -> Result<(), ClinicError> {
    if NaiveTime::parse_from_str(&schedule.time, "%H:%M").is_err() {
        return Err(ClinicError::validation("time must be HH:MM"));
    }
    if schedule.location.trim().is_empty() {
        return Err(ClinicError::validation("location is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::{open_database, open_memory_database};
    use crate::models::{Role, User};
    use chrono::NaiveDate;

    fn insert_actor(conn: &Connection, role: Role) -> Actor {
        let kind = role.kind();
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "User".into(),
            national_id: Uuid::new_v4().to_string(),
            email: format!("{}@clinic.com", Uuid::new_v4()),
            phone: "555-0100".into(),
            role,
            created_at: chrono::Local::now().naive_local(),
        };
        insert_user(conn, &user, &hash_password("pw").unwrap()).unwrap();
        Actor { id: user.id, role: kind }
    }

    fn patient(conn: &Connection) -> Actor {
        insert_actor(conn, Role::Patient)
    }

    fn doctor(conn: &Connection) -> Actor {
        insert_actor(conn, Role::Doctor { specialty: "GP".into() })
    }

    fn booking() -> NewAppointment {
        NewAppointment {
            service_type: "Consulta General".into(),
            notes: None,
        }
    }

    fn schedule() -> Schedule {
        Schedule {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            time: "09:00".into(),
            location: "Consultorio 1".into(),
        }
    }

    // ── book ─────────────────────────────────────────────

    #[test]
    fn book_creates_pending_paid_unassigned() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);

        let appt = book(&conn, &p, &booking()).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.patient_id, p.id);
        assert!(appt.doctor_id.is_none());
        assert!(appt.paid);
        assert!(appt.date.is_none() && appt.time.is_none());
    }

    #[test]
    fn book_rejects_non_patients() {
        let conn = open_memory_database().unwrap();
        let d = doctor(&conn);
        let c = insert_actor(&conn, Role::Company { company_name: "Salud SA".into() });

        assert!(matches!(book(&conn, &d, &booking()), Err(ClinicError::Authorization)));
        assert!(matches!(book(&conn, &c, &booking()), Err(ClinicError::Authorization)));
    }

    #[test]
    fn book_requires_service_type() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let err = book(&conn, &p, &NewAppointment { service_type: "  ".into(), notes: None });
        assert!(matches!(err, Err(ClinicError::Validation(_))));
    }

    // ── accept ───────────────────────────────────────────

    #[test]
    fn accept_sets_doctor_and_schedule_atomically() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();

        let confirmed = accept(&conn, &d, &appt.id, &schedule()).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.doctor_id, Some(d.id));
        assert_eq!(confirmed.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(confirmed.time.as_deref(), Some("09:00"));
        assert_eq!(confirmed.location.as_deref(), Some("Consultorio 1"));
    }

    #[test]
    fn second_accept_is_stale() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d1 = doctor(&conn);
        let d2 = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();

        accept(&conn, &d1, &appt.id, &schedule()).unwrap();
        let err = accept(&conn, &d2, &appt.id, &schedule()).unwrap_err();
        assert!(matches!(err, ClinicError::StaleState));

        // Winner's data untouched
        let current = crate::db::repository::get_appointment(&conn, &appt.id)
            .unwrap()
            .unwrap();
        assert_eq!(current.doctor_id, Some(d1.id));
    }

    #[test]
    fn accept_terminal_is_invalid_transition() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        cancel(&conn, &p, &appt.id).unwrap();

        let err = accept(&conn, &d, &appt.id, &schedule()).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::InvalidTransition { current: AppointmentStatus::Cancelled }
        ));
    }

    #[test]
    fn accept_validates_schedule() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();

        let bad_time = Schedule { time: "9 AM".into(), ..schedule() };
        assert!(matches!(
            accept(&conn, &d, &appt.id, &bad_time),
            Err(ClinicError::Validation(_))
        ));

        let no_location = Schedule { location: " ".into(), ..schedule() };
        assert!(matches!(
            accept(&conn, &d, &appt.id, &no_location),
            Err(ClinicError::Validation(_))
        ));
    }

    #[test]
    fn accept_by_patient_is_denied() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        let err = accept(&conn, &p, &appt.id, &schedule()).unwrap_err();
        assert!(matches!(err, ClinicError::Authorization));
    }

    #[test]
    fn accept_unknown_id_is_not_found() {
        let conn = open_memory_database().unwrap();
        let d = doctor(&conn);
        let err = accept(&conn, &d, &Uuid::new_v4(), &schedule()).unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }

    // ── reject ───────────────────────────────────────────

    #[test]
    fn reject_cancels_without_assigning_doctor() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();

        let rejected = reject(&conn, &d, &appt.id).unwrap();
        assert_eq!(rejected.status, AppointmentStatus::Cancelled);
        assert!(rejected.doctor_id.is_none());
        assert_eq!(rejected.cancelled_by, Some(CancelledBy::Doctor));
    }

    #[test]
    fn reject_anothers_confirmed_is_denied() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d1 = doctor(&conn);
        let d2 = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        accept(&conn, &d1, &appt.id, &schedule()).unwrap();

        let err = reject(&conn, &d2, &appt.id).unwrap_err();
        assert!(matches!(err, ClinicError::Authorization));
    }

    #[test]
    fn reject_own_confirmed_is_invalid_transition() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        accept(&conn, &d, &appt.id, &schedule()).unwrap();

        let err = reject(&conn, &d, &appt.id).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::InvalidTransition { current: AppointmentStatus::Confirmed }
        ));
    }

    // ── cancel ───────────────────────────────────────────

    #[test]
    fn patient_cancels_pending() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();

        let cancelled = cancel(&conn, &p, &appt.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Patient));
    }

    #[test]
    fn patient_cancels_confirmed() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        accept(&conn, &d, &appt.id, &schedule()).unwrap();

        let cancelled = cancel(&conn, &p, &appt.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        // The claim survives cancellation, distinguishable from a reject
        assert_eq!(cancelled.doctor_id, Some(d.id));
        assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Patient));
    }

    #[test]
    fn cancel_terminal_is_invalid_transition() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        cancel(&conn, &p, &appt.id).unwrap();

        let err = cancel(&conn, &p, &appt.id).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::InvalidTransition { current: AppointmentStatus::Cancelled }
        ));
    }

    #[test]
    fn cancel_someone_elses_appointment_is_not_found() {
        let conn = open_memory_database().unwrap();
        let p1 = patient(&conn);
        let p2 = patient(&conn);
        let appt = book(&conn, &p1, &booking()).unwrap();

        let err = cancel(&conn, &p2, &appt.id).unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }

    // ── complete ─────────────────────────────────────────

    #[test]
    fn assigned_doctor_completes_confirmed() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        accept(&conn, &d, &appt.id, &schedule()).unwrap();

        let done = complete(&conn, &d, &appt.id).unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[test]
    fn other_doctor_cannot_complete() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d1 = doctor(&conn);
        let d2 = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();
        accept(&conn, &d1, &appt.id, &schedule()).unwrap();

        let err = complete(&conn, &d2, &appt.id).unwrap_err();
        assert!(matches!(err, ClinicError::Authorization));
    }

    #[test]
    fn complete_pending_is_invalid_transition() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn);
        let appt = book(&conn, &p, &booking()).unwrap();

        let err = complete(&conn, &d, &appt.id).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::InvalidTransition { current: AppointmentStatus::Pending }
        ));
    }

    // ── full scenario from the workflow design ───────────

    #[test]
    fn booking_to_cancellation_scenario() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d1 = doctor(&conn);
        let d2 = doctor(&conn);

        // Patient books "Consulta General"
        let appt = book(&conn, &p, &booking()).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert!(appt.paid);

        // D1 accepts with a concrete schedule
        let confirmed = accept(&conn, &d1, &appt.id, &schedule()).unwrap();
        assert_eq!(confirmed.doctor_id, Some(d1.id));

        // D2's accept arrives late, already claimed
        assert!(matches!(
            accept(&conn, &d2, &appt.id, &schedule()),
            Err(ClinicError::StaleState)
        ));

        // Patient cancels the confirmed appointment, allowed
        let cancelled = cancel(&conn, &p, &appt.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        // D1 cannot complete a cancelled appointment
        assert!(matches!(
            complete(&conn, &d1, &appt.id),
            Err(ClinicError::InvalidTransition { current: AppointmentStatus::Cancelled })
        ));
    }

    // ── concurrency ──────────────────────────────────────

    #[test]
    fn concurrent_accepts_have_exactly_one_winner() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("race.db");

        let (d1, d2, appt_id) = {
            let conn = open_database(&db_path).unwrap();
            let p = patient(&conn);
            let d1 = doctor(&conn);
            let d2 = doctor(&conn);
            let appt = book(&conn, &p, &booking()).unwrap();
            (d1, d2, appt.id)
        };

        let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));
        let mut handles = Vec::new();
        for d in [d1, d2] {
            let path = db_path.clone();
            let barrier = barrier.clone();
            handles.push(std::thread::spawn(move || {
                let conn = open_database(&path).unwrap();
                barrier.wait();
                accept(&conn, &d, &appt_id, &schedule())
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one accept must win");
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(loser, Err(ClinicError::StaleState)));

        // Final state carries exactly the winner's assignment
        let conn = open_database(&db_path).unwrap();
        let current = crate::db::repository::get_appointment(&conn, &appt_id)
            .unwrap()
            .unwrap();
        let winner_doctor = winners[0].as_ref().unwrap().doctor_id;
        assert_eq!(current.status, AppointmentStatus::Confirmed);
        assert_eq!(current.doctor_id, winner_doctor);
    }
}
