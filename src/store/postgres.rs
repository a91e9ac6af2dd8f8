use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ChirpRecord, RefreshTokenRecord, Store, UserRecord};
use crate::error::{AppError, DatabaseError};

type UserRow = (Uuid, String, String, DateTime<Utc>, DateTime<Utc>, bool);
type RefreshTokenRow = (
    String,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

type ChirpRow = (Uuid, DateTime<Utc>, DateTime<Utc>, String, Uuid);

const USER_COLUMNS: &str = "id, email, hashed_password, created_at, updated_at, is_premium";
const CHIRP_COLUMNS: &str = "id, created_at, updated_at, body, user_id";

fn user_from_row(row: UserRow) -> UserRecord {
    let (id, email, hashed_password, created_at, updated_at, is_premium) = row;
    UserRecord {
        id,
        email,
        hashed_password,
        created_at,
        updated_at,
        is_premium,
    }
}

fn chirp_from_row(row: ChirpRow) -> ChirpRecord {
    let (id, created_at, updated_at, body, user_id) = row;
    ChirpRecord {
        id,
        created_at,
        updated_at,
        body,
        user_id,
    }
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<UserRecord, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, hashed_password, created_at, updated_at, is_premium)
            VALUES ($1, $2, $3, $4, $4, false)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(email)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row)
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()).into())
    }

    async fn upgrade_user(&self, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET is_premium = true, updated_at = $2
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn reset_users(&self) -> Result<(), AppError> {
        // chirps and refresh_tokens cascade on delete
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_chirp(&self, user_id: Uuid, body: &str) -> Result<ChirpRecord, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, ChirpRow>(&format!(
            r#"
            INSERT INTO chirps (id, created_at, updated_at, body, user_id)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING {}
            "#,
            CHIRP_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(body)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(chirp_from_row(row))
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> Result<Vec<ChirpRecord>, AppError> {
        let rows = sqlx::query_as::<_, ChirpRow>(&format!(
            r#"
            SELECT {}
            FROM chirps
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at ASC
            "#,
            CHIRP_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(chirp_from_row).collect())
    }

    async fn find_chirp(&self, id: Uuid) -> Result<Option<ChirpRecord>, AppError> {
        let row = sqlx::query_as::<_, ChirpRow>(&format!(
            "SELECT {} FROM chirps WHERE id = $1",
            CHIRP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(chirp_from_row))
    }

    async fn delete_chirp(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT token_hash, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(token_hash, user_id, created_at, updated_at, expires_at, revoked_at)| {
                RefreshTokenRecord {
                    token_hash,
                    user_id,
                    created_at,
                    updated_at,
                    expires_at,
                    revoked_at,
                }
            },
        ))
    }

    async fn mark_refresh_token_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        // COALESCE keeps the first revocation instant on repeated revokes
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $1), updated_at = $1
            WHERE token_hash = $2
            "#,
        )
        .bind(revoked_at)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
