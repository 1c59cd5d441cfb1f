//! Password hashing and login sessions.
//!
//! Passwords are hashed with Argon2id. A successful login issues a random
//! bearer token; only its BLAKE3 hash is stored, so a leaked database does
//! not leak live sessions.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::User;
use crate::storage::Storage;

/// Hash a password for storage.
///
/// # Errors
///
/// Returns [`Error::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| Error::PasswordHash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash. A malformed hash never matches.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// The stored form of a bearer token.
#[must_use]
pub fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// A newly issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Bearer token. Shown once, never stored.
    pub token: String,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// The signed-in user.
    pub user: User,
}

/// [`hash_password`] on the blocking thread pool.
///
/// # Errors
///
/// Returns [`Error::PasswordHash`] if hashing fails, or [`Error::Internal`]
/// if the task is lost.
pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| Error::internal(format!("password hashing task failed: {e}")))?
}

/// [`verify_password`] on the blocking thread pool.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the task is lost.
pub async fn verify_password_blocking(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| Error::internal(format!("password verification task failed: {e}")))
}

/// The error for an unknown email or a wrong password. Both read the same.
#[must_use]
pub fn rejected_login() -> Error {
    warn!("Failed login attempt");
    Error::invalid("email", "These credentials do not match our records.")
}

/// Issue a session for a user whose password has been checked.
///
/// # Errors
///
/// Returns a storage error if the session cannot be stored.
pub fn open_session(storage: &Storage, user: User, lifetime: Duration) -> Result<Session> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + lifetime;
    storage.create_session(&token_hash(&token), user.id, expires_at)?;
    info!("User {} signed in", user.id);

    Ok(Session {
        token,
        expires_at,
        user,
    })
}

/// Check credentials and open a session, all on the calling thread.
///
/// # Errors
///
/// Returns [`Error::Validation`] on bad credentials, or a storage error.
pub fn login(storage: &Storage, email: &str, password: &str, lifetime: Duration) -> Result<Session> {
    match storage.get_user_by_email(email.trim())? {
        Some((user, hash)) if verify_password(password, &hash) => {
            open_session(storage, user, lifetime)
        }
        _ => Err(rejected_login()),
    }
}

/// Resolve a bearer token to its user.
///
/// # Errors
///
/// Returns a storage error if the lookup fails.
pub fn authenticate(storage: &Storage, token: &str) -> Result<Option<User>> {
    storage.user_for_session(&token_hash(token))
}

/// Revoke a bearer token.
///
/// # Errors
///
/// Returns a storage error if the delete fails.
pub fn logout(storage: &Storage, token: &str) -> Result<bool> {
    storage.delete_session(&token_hash(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserDraft};

    fn storage_with_user(password: &str) -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .create_user(&UserDraft {
                name: "Admin".to_string(),
                email: "admin@example.com".to_string(),
                password_hash: Some(hash_password(password).unwrap()),
                role: Role::Superadmin,
                phone_number: None,
            })
            .unwrap();
        storage
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("x", "not-a-hash"));
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let h = token_hash("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, token_hash("abc"));
        assert_ne!(h, token_hash("abd"));
    }

    #[test]
    fn test_login_authenticate_logout() {
        let storage = storage_with_user("rahasia123");
        let session = login(&storage, "admin@example.com", "rahasia123", Duration::hours(1)).unwrap();
        assert_eq!(session.user.role, Role::Superadmin);

        let user = authenticate(&storage, &session.token).unwrap().unwrap();
        assert_eq!(user.id, session.user.id);

        assert!(logout(&storage, &session.token).unwrap());
        assert!(authenticate(&storage, &session.token).unwrap().is_none());
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let storage = storage_with_user("rahasia123");
        let err = login(&storage, "admin@example.com", "wrong", Duration::hours(1)).unwrap_err();
        assert!(err.is_validation());
        let err = login(&storage, "nobody@example.com", "rahasia123", Duration::hours(1)).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_blocking_hash_and_verify() {
        let hash = hash_password_blocking("rahasia123".to_string()).await.unwrap();
        assert!(verify_password_blocking("rahasia123".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("salah".to_string(), hash).await.unwrap());
    }

    #[test]
    fn test_open_session_stores_token_hash() {
        let storage = storage_with_user("rahasia123");
        let (user, _) = storage.get_user_by_email("admin@example.com").unwrap().unwrap();
        let session = open_session(&storage, user.clone(), Duration::hours(1)).unwrap();
        assert_eq!(session.user, user);
        let found = authenticate(&storage, &session.token).unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn test_expired_session_does_not_authenticate() {
        let storage = storage_with_user("rahasia123");
        let session = login(&storage, "admin@example.com", "rahasia123", Duration::seconds(-1)).unwrap();
        assert!(authenticate(&storage, &session.token).unwrap().is_none());
    }
}
