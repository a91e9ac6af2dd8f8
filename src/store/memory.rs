use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{ChirpRecord, RefreshTokenRecord, Store, UserRecord};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    // insertion order is creation order
    chirps: Vec<ChirpRecord>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// Process-local store. All tables sit behind one lock so that resetting
/// users with their chirps and tokens is atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables.lock().map_err(|_| {
            DatabaseError::UnexpectedError("in-memory store lock poisoned".to_string()).into()
        })
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<UserRecord, AppError> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.email == email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )
            .into());
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: now,
            updated_at: now,
            is_premium: false,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let tables = self.tables()?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, AppError> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.email == email && u.id != id) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )
            .into());
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn upgrade_user(&self, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        let mut tables = self.tables()?;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_premium = true;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn reset_users(&self) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        tables.users.clear();
        tables.chirps.clear();
        tables.refresh_tokens.clear();
        Ok(())
    }

    async fn create_chirp(&self, user_id: Uuid, body: &str) -> Result<ChirpRecord, AppError> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&user_id) {
            return Err(DatabaseError::NotFound("User not found".to_string()).into());
        }

        let now = Utc::now();
        let chirp = ChirpRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.to_string(),
            user_id,
        };
        tables.chirps.push(chirp.clone());
        Ok(chirp)
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> Result<Vec<ChirpRecord>, AppError> {
        let tables = self.tables()?;
        Ok(tables
            .chirps
            .iter()
            .filter(|c| author_id.map_or(true, |author| c.user_id == author))
            .cloned()
            .collect())
    }

    async fn find_chirp(&self, id: Uuid) -> Result<Option<ChirpRecord>, AppError> {
        let tables = self.tables()?;
        Ok(tables.chirps.iter().find(|c| c.id == id).cloned())
    }

    async fn delete_chirp(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables()?;
        let before = tables.chirps.len();
        tables.chirps.retain(|c| c.id != id);
        Ok(tables.chirps.len() < before)
    }

    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if tables.refresh_tokens.contains_key(&record.token_hash) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Refresh token already exists".to_string(),
            )
            .into());
        }
        tables
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let tables = self.tables()?;
        Ok(tables.refresh_tokens.get(token_hash).cloned())
    }

    async fn mark_refresh_token_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables()?;
        match tables.refresh_tokens.get_mut(token_hash) {
            Some(record) => {
                if record.revoked_at.is_none() {
                    record.revoked_at = Some(revoked_at);
                }
                record.updated_at = revoked_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token_hash: &str, user_id: Uuid) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            token_hash: token_hash.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(60),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store.create_user("a@example.com", "hash").await.unwrap();

        let result = store.create_user("a@example.com", "other").await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let store = InMemoryStore::new();
        let result = store.update_user(Uuid::new_v4(), "a@example.com", "hash").await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_upgrade_user() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@example.com", "hash").await.unwrap();
        assert!(!user.is_premium);

        let upgraded = store.upgrade_user(user.id).await.unwrap().unwrap();
        assert!(upgraded.is_premium);
        assert!(store.upgrade_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_keeps_first_revocation_instant() {
        let store = InMemoryStore::new();
        store.create_refresh_token(&record("abc", Uuid::new_v4())).await.unwrap();

        let first = Utc::now();
        assert!(store.mark_refresh_token_revoked("abc", first).await.unwrap());
        let later = first + Duration::seconds(30);
        assert!(store.mark_refresh_token_revoked("abc", later).await.unwrap());

        let stored = store.find_refresh_token("abc").await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(first));
        assert!(!store.mark_refresh_token_revoked("missing", first).await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_clears_users_and_tokens() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@example.com", "hash").await.unwrap();
        store.create_refresh_token(&record("abc", user.id)).await.unwrap();

        store.reset_users().await.unwrap();

        assert!(store.find_user_by_email("a@example.com").await.unwrap().is_none());
        assert!(store.find_refresh_token("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chirps_filter_and_order() {
        let store = InMemoryStore::new();
        let alice = store.create_user("alice@example.com", "hash").await.unwrap();
        let bob = store.create_user("bob@example.com", "hash").await.unwrap();

        let first = store.create_chirp(alice.id, "first").await.unwrap();
        store.create_chirp(bob.id, "second").await.unwrap();
        let third = store.create_chirp(alice.id, "third").await.unwrap();

        let all = store.list_chirps(None).await.unwrap();
        let bodies: Vec<&str> = all.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);

        assert_eq!(store.list_chirps(Some(alice.id)).await.unwrap(), vec![first.clone(), third]);
        assert!(store.list_chirps(Some(Uuid::new_v4())).await.unwrap().is_empty());

        assert!(store.delete_chirp(first.id).await.unwrap());
        assert!(!store.delete_chirp(first.id).await.unwrap());
        assert!(store.find_chirp(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chirp_requires_existing_author() {
        let store = InMemoryStore::new();
        let result = store.create_chirp(Uuid::new_v4(), "orphan").await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_reset_removes_chirps() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@example.com", "hash").await.unwrap();
        store.create_chirp(user.id, "hello").await.unwrap();

        store.reset_users().await.unwrap();

        assert!(store.list_chirps(None).await.unwrap().is_empty());
    }
}
