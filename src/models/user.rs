use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RoleKind;

/// Role as a tagged union; the doctor/company payloads only exist for
/// their variant, never as conditionally-required fields on `User`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor { specialty: String },
    Company { company_name: String },
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Patient => RoleKind::Patient,
            Self::Doctor { .. } => RoleKind::Doctor,
            Self::Company { .. } => RoleKind::Company,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub email: String,
    pub phone: String,
    #[serde(flatten)]
    pub role: Role,
    pub created_at: NaiveDateTime,
}

/// The role+identity pair making a request. Resolved from a session
/// token and passed explicitly to every authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: RoleKind,
}

/// Registration input; password travels here, never on `User`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub email: String,
    pub phone: String,
    #[serde(flatten)]
    pub role: Role,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_kind_matches_variant() {
        assert_eq!(Role::Patient.kind(), RoleKind::Patient);
        assert_eq!(
            Role::Doctor { specialty: "Cardiology".into() }.kind(),
            RoleKind::Doctor
        );
        assert_eq!(
            Role::Company { company_name: "Salud SA".into() }.kind(),
            RoleKind::Company
        );
    }

    #[test]
    fn role_serializes_tagged() {
        let json = serde_json::to_value(Role::Doctor { specialty: "Neurology".into() }).unwrap();
        assert_eq!(json["role"], "doctor");
        assert_eq!(json["specialty"], "Neurology");

        let json = serde_json::to_value(Role::Patient).unwrap();
        assert_eq!(json["role"], "patient");
        assert!(json.get("specialty").is_none());
    }
}
