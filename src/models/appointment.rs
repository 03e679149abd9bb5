use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, CancelledBy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Unset while pending; set atomically with date/time/location when a
    /// doctor claims the request.
    pub doctor_id: Option<Uuid>,
    pub service_type: String,
    pub date: Option<NaiveDate>,
    /// Free-form "HH:MM".
    pub time: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub paid: bool,
    pub status: AppointmentStatus,
    pub cancelled_by: Option<CancelledBy>,
    pub created_at: NaiveDateTime,
}

/// Booking input from a patient.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub service_type: String,
    pub notes: Option<String>,
}

/// Scheduling details a doctor supplies at the accept transition.
/// Only ever applied together with the pending→confirmed status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
}
