//! Credential verification.
//!
//! Passwords are stored as PBKDF2 PHC strings. Login failures are a single
//! undifferentiated `Authorization` error; whether the email, password, or
//! role was wrong is never disclosed.

use pbkdf2::password_hash::rand_core::OsRng;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rusqlite::Connection;

use crate::db::repository;
use crate::error::ClinicError;
use crate::models::{RoleKind, User};

pub fn hash_password(password: &str) -> Result<String, ClinicError> {
    let salt = SaltString::generate(&mut OsRng);
    Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ClinicError::validation(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .and_then(|parsed| Pbkdf2.verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Verify `(email, password, role)` and return the matching user.
///
/// The claimed role must match the stored record; a doctor token can never
/// be minted from patient credentials.
pub fn verify_credentials(
    conn: &Connection,
    email: &str,
    password: &str,
    role: RoleKind,
) -> Result<User, ClinicError> {
    let Some((user, stored_hash)) = repository::find_user_by_email(conn, email)? else {
        return Err(ClinicError::Authorization);
    };

    if user.role.kind() != role || !verify_password(password, &stored_hash) {
        return Err(ClinicError::Authorization);
    }

    Ok(user)
}
