//! Role-based authorization policy.
//!
//! Pure, side-effect-free, deterministic. Rules are a cascade evaluated in
//! priority order; first match wins, default deny:
//! 1. company → read any appointment or user record (oversight only)
//! 2. doctor → read the pending request queue and its own claimed work
//! 3. patient → read/write only its own appointments
//! 4. deny
//!
//! Callers translate a denied read into `NotFound` so denials never leak
//! record existence.

use uuid::Uuid;

use crate::models::{Actor, Appointment, AppointmentStatus, RoleKind};

/// Why access was granted (or denied), kept for audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Company actor exercising full read oversight.
    CompanyOversight,
    /// Pending appointments are visible to every doctor as a request queue.
    PendingQueue,
    /// Doctor reading an appointment it has claimed.
    AssignedDoctor,
    /// Patient reading an appointment it owns.
    OwnAppointment,
    /// No matching rule; access denied.
    Denied,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny() -> Self {
        Self { allowed: false, reason: AccessReason::Denied }
    }
}

/// Can the actor see this appointment at all?
pub fn check_appointment_read(actor: &Actor, appt: &Appointment) -> AccessDecision {
    match actor.role {
        // Rule 1: company oversight
        RoleKind::Company => AccessDecision::allow(AccessReason::CompanyOversight),

        // Rule 2: doctors see the shared request queue plus their own work
        RoleKind::Doctor => {
            if appt.status == AppointmentStatus::Pending {
                AccessDecision::allow(AccessReason::PendingQueue)
            } else if appt.doctor_id == Some(actor.id) {
                AccessDecision::allow(AccessReason::AssignedDoctor)
            } else {
                AccessDecision::deny()
            }
        }

        // Rule 3: patients see only what they own
        RoleKind::Patient => {
            if appt.patient_id == actor.id {
                AccessDecision::allow(AccessReason::OwnAppointment)
            } else {
                AccessDecision::deny()
            }
        }
    }
}

/// Can the actor read this user record? Company reads anyone; everyone
/// reads themselves.
pub fn can_read_user(actor: &Actor, user_id: &Uuid) -> bool {
    actor.role == RoleKind::Company || actor.id == *user_id
}

/// Account creation/deletion on others' behalf is company-only. A company
/// may never alter appointment status (enforced by the lifecycle module,
/// which accepts no company actors).
pub fn can_manage_accounts(actor: &Actor) -> bool {
    actor.role == RoleKind::Company
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Appointment;
    use chrono::NaiveDate;

    fn actor(role: RoleKind) -> Actor {
        Actor { id: Uuid::new_v4(), role }
    }

    fn pending_appointment(patient_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: None,
            service_type: "Consulta General".into(),
            date: None,
            time: None,
            location: None,
            notes: None,
            paid: true,
            status: AppointmentStatus::Pending,
            cancelled_by: None,
            created_at: chrono::Local::now().naive_local(),
        }
    }

    fn confirmed_appointment(patient_id: Uuid, doctor_id: Uuid) -> Appointment {
        let mut appt = pending_appointment(patient_id);
        appt.doctor_id = Some(doctor_id);
        appt.date = NaiveDate::from_ymd_opt(2026, 3, 1);
        appt.time = Some("09:00".into());
        appt.location = Some("Consultorio 1".into());
        appt.status = AppointmentStatus::Confirmed;
        appt
    }

    // ── Rule 1: company oversight ────────────────────────

    #[test]
    fn company_reads_any_appointment() {
        let company = actor(RoleKind::Company);
        let appt = confirmed_appointment(Uuid::new_v4(), Uuid::new_v4());

        let decision = check_appointment_read(&company, &appt);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::CompanyOversight);
    }

    // ── Rule 2: doctor visibility ────────────────────────

    #[test]
    fn any_doctor_reads_pending_queue() {
        let doctor = actor(RoleKind::Doctor);
        let appt = pending_appointment(Uuid::new_v4());

        let decision = check_appointment_read(&doctor, &appt);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::PendingQueue);
    }

    #[test]
    fn assigned_doctor_reads_own_confirmed() {
        let doctor = actor(RoleKind::Doctor);
        let appt = confirmed_appointment(Uuid::new_v4(), doctor.id);

        let decision = check_appointment_read(&doctor, &appt);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::AssignedDoctor);
    }

    #[test]
    fn doctor_cannot_read_other_doctors_confirmed() {
        let doctor = actor(RoleKind::Doctor);
        let appt = confirmed_appointment(Uuid::new_v4(), Uuid::new_v4());

        let decision = check_appointment_read(&doctor, &appt);
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Denied);
    }

    // ── Rule 3: patient ownership ────────────────────────

    #[test]
    fn patient_reads_own_appointment_any_status() {
        let patient = actor(RoleKind::Patient);
        let pending = pending_appointment(patient.id);
        let confirmed = confirmed_appointment(patient.id, Uuid::new_v4());

        assert!(check_appointment_read(&patient, &pending).allowed);
        let decision = check_appointment_read(&patient, &confirmed);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::OwnAppointment);
    }

    #[test]
    fn patient_cannot_read_others_appointment() {
        let patient = actor(RoleKind::Patient);
        let appt = pending_appointment(Uuid::new_v4());

        assert!(!check_appointment_read(&patient, &appt).allowed);
    }

    // ── User records & account management ────────────────

    #[test]
    fn user_record_visibility() {
        let company = actor(RoleKind::Company);
        let patient = actor(RoleKind::Patient);
        let other = Uuid::new_v4();

        assert!(can_read_user(&company, &other));
        assert!(can_read_user(&patient, &patient.id));
        assert!(!can_read_user(&patient, &other));
    }

    #[test]
    fn only_company_manages_accounts() {
        assert!(can_manage_accounts(&actor(RoleKind::Company)));
        assert!(!can_manage_accounts(&actor(RoleKind::Doctor)));
        assert!(!can_manage_accounts(&actor(RoleKind::Patient)));
    }
}
