/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 bytes from the OS-seeded CSPRNG, rendered as 64 lowercase hex chars
/// - Stored as their SHA-256 digest, never in plaintext
/// - Valid for 60 days, with no sliding expiry and no rotation on use
/// - Revoked by stamping `revoked_at`; rows are kept for later inspection

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::store::{RefreshTokenRecord, Store};

/// Lifetime of a refresh token from its creation.
pub const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 60;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new refresh token value (256 bits of entropy, hex encoded).
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest under which a token is stored.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate and persist a refresh token for `user_id`, expiring in 60 days.
///
/// Returns the plaintext token; only its hash is stored.
pub async fn issue_refresh_token(store: &dyn Store, user_id: Uuid) -> Result<String, AppError> {
    let now = Utc::now();
    issue_refresh_token_with_expiry(
        store,
        user_id,
        now,
        now + Duration::days(REFRESH_TOKEN_LIFETIME_DAYS),
    )
    .await
}

/// Generate and persist a refresh token with an explicit creation and expiry instant.
pub async fn issue_refresh_token_with_expiry(
    store: &dyn Store,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<String, AppError> {
    let token = generate_refresh_token();

    store
        .create_refresh_token(&RefreshTokenRecord {
            token_hash: hash_token(&token),
            user_id,
            created_at,
            updated_at: created_at,
            expires_at,
            revoked_at: None,
        })
        .await?;

    Ok(token)
}

/// Resolve a refresh token to the user who owns it.
///
/// # Errors
/// - `TokenNotFound` if no record exists
/// - `TokenRevoked` if the token was revoked (takes precedence over expiry)
/// - `TokenExpired` if `now` is past `expires_at`
pub async fn resolve_refresh_token(store: &dyn Store, token: &str) -> Result<Uuid, AppError> {
    resolve_refresh_token_at(store, token, Utc::now()).await
}

/// `resolve_refresh_token` as if the current time were `now`.
pub async fn resolve_refresh_token_at(
    store: &dyn Store,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, AppError> {
    let record = store
        .find_refresh_token(&hash_token(token))
        .await?
        .ok_or_else(|| {
            tracing::warn!("Refresh token not found");
            AuthError::TokenNotFound
        })?;

    if record.revoked_at.is_some() {
        tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
        return Err(AuthError::TokenRevoked.into());
    }

    if now > record.expires_at {
        tracing::info!(user_id = %record.user_id, "Refresh token expired");
        return Err(AuthError::TokenExpired.into());
    }

    Ok(record.user_id)
}

/// Revoke a refresh token. Revoking an already-revoked token succeeds and
/// keeps the original revocation instant.
///
/// # Errors
/// `TokenNotFound` if the token was never issued
pub async fn revoke_refresh_token(store: &dyn Store, token: &str) -> Result<(), AppError> {
    let found = store
        .mark_refresh_token_revoked(&hash_token(token), Utc::now())
        .await?;

    if !found {
        return Err(AuthError::TokenNotFound.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn auth_kind(result: Result<Uuid, AppError>) -> Option<AuthError> {
        result.err().and_then(|e| e.auth_kind().cloned())
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_refresh_token());
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_refresh_token();
        let hash1 = hash_token(&token);

        assert_eq!(hash1, hash_token(&token));
        assert_ne!(token, hash1);
        assert_eq!(hash1.len(), 64);
    }

    #[tokio::test]
    async fn test_issued_token_resolves_to_owner() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();

        let token = issue_refresh_token(&store, user_id).await.unwrap();

        assert_eq!(resolve_refresh_token(&store, &token).await.unwrap(), user_id);
        // no rotation: the same token keeps working
        assert_eq!(resolve_refresh_token(&store, &token).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_plaintext_token_is_not_stored() {
        let store = InMemoryStore::new();
        let token = issue_refresh_token(&store, Uuid::new_v4()).await.unwrap();

        assert!(store.find_refresh_token(&token).await.unwrap().is_none());
        let record = store.find_refresh_token(&hash_token(&token)).await.unwrap().unwrap();
        assert_eq!(
            record.expires_at - record.created_at,
            Duration::days(REFRESH_TOKEN_LIFETIME_DAYS)
        );
        assert!(record.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let store = InMemoryStore::new();
        let token = issue_refresh_token(&store, Uuid::new_v4()).await.unwrap();

        revoke_refresh_token(&store, &token).await.unwrap();

        assert_eq!(
            auth_kind(resolve_refresh_token(&store, &token).await),
            Some(AuthError::TokenRevoked)
        );
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = InMemoryStore::new();
        let token = issue_refresh_token(&store, Uuid::new_v4()).await.unwrap();

        revoke_refresh_token(&store, &token).await.unwrap();
        assert!(revoke_refresh_token(&store, &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let store = InMemoryStore::new();
        let token = generate_refresh_token();

        assert_eq!(
            auth_kind(resolve_refresh_token(&store, &token).await),
            Some(AuthError::TokenNotFound)
        );
        let revoke = revoke_refresh_token(&store, &token).await;
        assert_eq!(
            revoke.err().and_then(|e| e.auth_kind().cloned()),
            Some(AuthError::TokenNotFound)
        );
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token = issue_refresh_token_with_expiry(&store, user_id, now, now).await.unwrap();

        assert_eq!(resolve_refresh_token_at(&store, &token, now).await.unwrap(), user_id);
        assert_eq!(
            auth_kind(resolve_refresh_token_at(&store, &token, now + Duration::seconds(1)).await),
            Some(AuthError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn test_revoked_takes_precedence_over_expired() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let token = issue_refresh_token_with_expiry(&store, Uuid::new_v4(), now, now)
            .await
            .unwrap();

        revoke_refresh_token(&store, &token).await.unwrap();

        assert_eq!(
            auth_kind(resolve_refresh_token_at(&store, &token, now + Duration::days(1)).await),
            Some(AuthError::TokenRevoked)
        );
    }
}
