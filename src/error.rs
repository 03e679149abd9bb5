//! Request-scoped error taxonomy.
//!
//! Every kind is terminal for the triggering request; nothing here is
//! fatal to the process. Callers may retry only on `StaleState`.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum ClinicError {
    /// Malformed or missing input, surfaced with a human-readable reason.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Actor lacks permission for the requested operation. Never
    /// downgraded to success.
    #[error("Operation not permitted for this actor")]
    Authorization,

    /// Requested transition is not legal from the current status. Carries
    /// the current status so the caller can resynchronize.
    #[error("Invalid transition: appointment is {current}")]
    InvalidTransition { current: AppointmentStatus },

    /// Lost a concurrent race for an atomic transition; the appointment
    /// was already claimed. Refresh and retry is reasonable.
    #[error("Appointment was claimed by another doctor")]
    StaleState,

    /// Missing, or not visible to the actor (denied reads are deliberately
    /// indistinguishable from absent).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ClinicError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}
