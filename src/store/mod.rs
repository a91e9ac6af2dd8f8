/// Persistence layer
///
/// The auth core and route handlers reach user, chirp and refresh-token records only
/// through the `Store` trait. `PostgresStore` backs production; `InMemoryStore`
/// backs tests and local runs without a database.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_premium: bool,
}

/// A persisted refresh token. Only the SHA-256 digest of the token value is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// A short post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChirpRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with a unique-constraint database error if the email is taken.
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<UserRecord, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Fails with a not-found database error if `id` is unknown.
    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, AppError>;

    /// Sets the premium flag. `None` if the user does not exist.
    async fn upgrade_user(&self, id: Uuid) -> Result<Option<UserRecord>, AppError>;

    /// Deletes every user together with their chirps and refresh tokens.
    async fn reset_users(&self) -> Result<(), AppError>;

    async fn create_chirp(&self, user_id: Uuid, body: &str) -> Result<ChirpRecord, AppError>;

    /// Oldest first, optionally restricted to one author.
    async fn list_chirps(&self, author_id: Option<Uuid>) -> Result<Vec<ChirpRecord>, AppError>;

    async fn find_chirp(&self, id: Uuid) -> Result<Option<ChirpRecord>, AppError>;

    /// Returns `false` if no chirp with this id exists.
    async fn delete_chirp(&self, id: Uuid) -> Result<bool, AppError>;

    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Sets `revoked_at` if it is still unset. Returns `false` only when no
    /// record with this hash exists.
    async fn mark_refresh_token_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}
