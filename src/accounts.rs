//! Account registration and company-managed account administration.

use rusqlite::Connection;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::authorization::can_manage_accounts;
use crate::db::repository;
use crate::error::ClinicError;
use crate::models::{Actor, NewUser, Role, RoleKind, User};

const MIN_PASSWORD_LEN: usize = 8;

/// Self-service registration, any role.
pub fn register(conn: &Connection, new_user: &NewUser) -> Result<User, ClinicError> {
    validate(new_user)?;

    // Uniqueness invariant holds across all roles. Pre-checked for a clear
    // message; the unique indexes remain the backstop.
    if repository::national_id_exists(conn, new_user.national_id.trim())? {
        return Err(ClinicError::validation("identity number already registered"));
    }
    if repository::email_exists(conn, new_user.email.trim())? {
        return Err(ClinicError::validation("email already registered"));
    }

    let user = User {
        id: Uuid::new_v4(),
        first_name: new_user.first_name.trim().to_string(),
        last_name: new_user.last_name.trim().to_string(),
        national_id: new_user.national_id.trim().to_string(),
        email: new_user.email.trim().to_string(),
        phone: new_user.phone.trim().to_string(),
        role: new_user.role.clone(),
        created_at: chrono::Local::now().naive_local(),
    };
    let hash = hash_password(&new_user.password)?;
    repository::insert_user(conn, &user, &hash)?;

    tracing::info!(user_id = %user.id, role = %user.role.kind(), "user registered");
    Ok(user)
}

/// A company creates a doctor or patient account on someone's behalf.
pub fn create_account(
    conn: &Connection,
    actor: &Actor,
    new_user: &NewUser,
) -> Result<User, ClinicError> {
    if !can_manage_accounts(actor) {
        return Err(ClinicError::Authorization);
    }
    if new_user.role.kind() == RoleKind::Company {
        return Err(ClinicError::Authorization);
    }
    register(conn, new_user)
}

/// A company deletes a doctor or patient account. Company accounts are
/// never deletable through this path.
pub fn delete_account(conn: &Connection, actor: &Actor, id: &Uuid) -> Result<(), ClinicError> {
    if !can_manage_accounts(actor) {
        return Err(ClinicError::Authorization);
    }

    let user = repository::get_user(conn, id)?
        .ok_or_else(|| ClinicError::not_found("User", id))?;
    if user.role.kind() == RoleKind::Company {
        return Err(ClinicError::Authorization);
    }

    repository::delete_user(conn, id)?;
    tracing::info!(user_id = %id, "account deleted");
    Ok(())
}

fn validate(new_user: &NewUser) -> Result<(), ClinicError> {
    for (value, label) in [
        (&new_user.first_name, "first name"),
        (&new_user.last_name, "last name"),
        (&new_user.national_id, "identity number"),
        (&new_user.phone, "phone"),
    ] {
        if value.trim().is_empty() {
            return Err(ClinicError::validation(format!("{label} is required")));
        }
    }

    let email = new_user.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ClinicError::validation("a valid email is required"));
    }
    if new_user.password.len() < MIN_PASSWORD_LEN {
        return Err(ClinicError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    match &new_user.role {
        Role::Patient => {}
        Role::Doctor { specialty } => {
            if specialty.trim().is_empty() {
                return Err(ClinicError::validation("doctor specialty is required"));
            }
        }
        Role::Company { company_name } => {
            if company_name.trim().is_empty() {
                return Err(ClinicError::validation("company name is required"));
            }
        }
    }
    Ok(())
}
