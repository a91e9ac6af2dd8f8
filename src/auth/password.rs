/// Password Hashing and Verification
///
/// bcrypt at its default cost. Hashes embed their own salt, so hashing the
/// same password twice yields different strings that both verify.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::error::AuthError;

lazy_static! {
    /// Stand-in hash verified when a login names no known user, so that path
    /// costs the same bcrypt work as a wrong password.
    static ref DUMMY_PASSWORD_HASH: String =
        hash_password("chirper-dummy-password").unwrap_or_default();
}

/// Hash a password with bcrypt.
///
/// # Errors
/// `HashingFailure` if bcrypt itself fails (e.g. the OS RNG is unavailable).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash(password, DEFAULT_COST).map_err(|e| AuthError::HashingFailure(e.to_string()))
}

/// Verify a password against a stored bcrypt hash.
///
/// Returns `Ok(false)` on an ordinary mismatch. bcrypt compares digests in
/// constant time.
///
/// # Errors
/// `HashingFailure` if `hash` is not a structurally valid bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    verify(password, hash).map_err(|e| AuthError::HashingFailure(e.to_string()))
}

/// Run `hash_password` on the blocking pool so the cost factor does not stall
/// an async worker.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::HashingFailure(e.to_string()))?
}

/// Blocking-pool counterpart of `verify_password`.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::HashingFailure(e.to_string()))?
}

/// Spend one bcrypt verification against a fixed hash and discard the result.
///
/// Used when there is no stored hash to check, so the caller's latency does
/// not reveal that the account is missing.
pub async fn verify_dummy_password_blocking(password: String) {
    let _ = tokio::task::spawn_blocking(move || verify_password(&password, &DUMMY_PASSWORD_HASH))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "correcthorse";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correcthorse").expect("Failed to hash password");

        let is_valid = verify_password("correcthorse", &hash).expect("Failed to verify password");
        assert!(is_valid);
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("correcthorse").expect("Failed to hash password");

        let is_valid = verify_password("batterystaple", &hash).expect("Failed to verify password");
        assert!(!is_valid);
    }

    #[test]
    fn test_same_password_hashes_differ() {
        let first = hash_password("correcthorse").unwrap();
        let second = hash_password("correcthorse").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("correcthorse", &first).unwrap());
        assert!(verify_password("correcthorse", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_hashing_failure() {
        let result = verify_password("correcthorse", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(AuthError::HashingFailure(_))));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hash = hash_password_blocking("correcthorse".to_string()).await.unwrap();
        assert!(verify_password_blocking("correcthorse".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("wrong".to_string(), hash).await.unwrap());
    }

    #[test]
    fn test_dummy_hash_uses_default_cost() {
        assert!(DUMMY_PASSWORD_HASH.starts_with(&format!("$2b${:02}$", DEFAULT_COST)));
        assert!(!verify_password("correcthorse", &DUMMY_PASSWORD_HASH).unwrap());
    }
}
