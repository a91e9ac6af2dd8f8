/// Session orchestration
///
/// Composes the password hasher, access token codec, refresh token store and
/// credential extractor into the login / refresh / revoke / authenticate
/// operations the HTTP layer calls.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::credentials::{extract_bearer, verify_api_key};
use crate::auth::jwt::{issue_access_token, validate_access_token};
use crate::auth::password::{
    hash_password_blocking, verify_dummy_password_blocking, verify_password_blocking,
};
use crate::auth::refresh_token::{issue_refresh_token, resolve_refresh_token, revoke_refresh_token};
use crate::configuration::{JwtSettings, MAX_ACCESS_TOKEN_EXPIRY};
use crate::error::{AppError, AuthError};
use crate::store::{Store, UserRecord};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserRecord,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    jwt: JwtSettings,
    api_key: String,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtSettings, api_key: String) -> Self {
        Self { store, jwt, api_key }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Lifetime for a login-issued access token. Requests outside (0, 3600]
    /// seconds fall back to the configured default.
    pub fn access_token_ttl(&self, requested_seconds: Option<i64>) -> Duration {
        let seconds = requested_seconds
            .filter(|s| *s > 0 && *s <= MAX_ACCESS_TOKEN_EXPIRY)
            .unwrap_or_else(|| self.jwt.access_token_expiry.min(MAX_ACCESS_TOKEN_EXPIRY));
        Duration::seconds(seconds)
    }

    /// Hash a new user's password.
    pub async fn create_credential(&self, password: &str) -> Result<String, AuthError> {
        hash_password_blocking(password.to_string()).await
    }

    /// Verify `password` against an already looked-up user and issue a token pair.
    ///
    /// An unknown email (`user` is `None`) and a wrong password both yield
    /// `InvalidCredentials` after one bcrypt verification; nothing is issued
    /// on either path.
    pub async fn login(
        &self,
        user: Option<UserRecord>,
        password: &str,
        expires_in_seconds: Option<i64>,
    ) -> Result<IssuedSession, AppError> {
        let user = match user {
            Some(user) => user,
            None => {
                verify_dummy_password_blocking(password.to_string()).await;
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let matches =
            verify_password_blocking(password.to_string(), user.hashed_password.clone()).await?;
        if !matches {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token =
            issue_access_token(user.id, &self.jwt, self.access_token_ttl(expires_in_seconds))?;
        let refresh_token = issue_refresh_token(self.store(), user.id).await?;

        Ok(IssuedSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Exchange the refresh token in `Bearer <token>` for a new access token.
    /// The refresh token itself stays valid.
    pub async fn refresh_access_token(&self, authorization: Option<&str>) -> Result<String, AppError> {
        let refresh_token = extract_bearer(authorization)?;
        let user_id = resolve_refresh_token(self.store(), refresh_token).await?;

        let access_token = issue_access_token(
            user_id,
            &self.jwt,
            Duration::seconds(MAX_ACCESS_TOKEN_EXPIRY),
        )?;

        Ok(access_token)
    }

    /// Permanently revoke the refresh token in `Bearer <token>`.
    pub async fn revoke_refresh_token(&self, authorization: Option<&str>) -> Result<(), AppError> {
        let refresh_token = extract_bearer(authorization)?;
        revoke_refresh_token(self.store(), refresh_token).await?;
        Ok(())
    }

    /// Authenticate a request by its `Bearer` access token. No store lookup.
    pub fn authenticate_request(&self, authorization: Option<&str>) -> Result<Uuid, AuthError> {
        let token = extract_bearer(authorization)?;
        validate_access_token(token, &self.jwt)
    }

    /// Authenticate a privileged caller by its `ApiKey` credential.
    pub fn authenticate_privileged(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        verify_api_key(authorization, &self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const API_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

    fn jwt_settings(secret: &str) -> JwtSettings {
        JwtSettings {
            secret: secret.to_string(),
            issuer: "chirper".to_string(),
            access_token_expiry: 3600,
        }
    }

    fn service() -> SessionService {
        SessionService::new(
            Arc::new(InMemoryStore::new()),
            jwt_settings("session-test-secret"),
            API_KEY.to_string(),
        )
    }

    async fn register(service: &SessionService, email: &str, password: &str) -> UserRecord {
        let hash = service.create_credential(password).await.unwrap();
        service.store().create_user(email, &hash).await.unwrap()
    }

    fn bearer(token: &str) -> Option<String> {
        Some(format!("Bearer {}", token))
    }

    fn auth_kind(err: AppError) -> Option<AuthError> {
        err.auth_kind().cloned()
    }

    #[tokio::test]
    async fn test_login_refresh_revoke_lifecycle() {
        let service = service();
        let user = register(&service, "u1@example.com", "correcthorse").await;

        let session = service
            .login(Some(user.clone()), "correcthorse", None)
            .await
            .expect("login should succeed");
        assert_eq!(
            service.authenticate_request(bearer(&session.access_token).as_deref()),
            Ok(user.id)
        );

        let refreshed = service
            .refresh_access_token(bearer(&session.refresh_token).as_deref())
            .await
            .unwrap();
        assert_eq!(service.authenticate_request(bearer(&refreshed).as_deref()), Ok(user.id));

        service
            .revoke_refresh_token(bearer(&session.refresh_token).as_deref())
            .await
            .unwrap();

        let err = service
            .refresh_access_token(bearer(&session.refresh_token).as_deref())
            .await
            .unwrap_err();
        assert_eq!(auth_kind(err), Some(AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let service = service();
        let user = register(&service, "u1@example.com", "correcthorse").await;

        let wrong_password = service.login(Some(user.clone()), "batterystaple", None).await.unwrap_err();
        let unknown_email = service.login(None, "correcthorse", None).await.unwrap_err();

        assert_eq!(auth_kind(wrong_password), Some(AuthError::InvalidCredentials));
        assert_eq!(auth_kind(unknown_email), Some(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_bcrypt_verification() {
        let service = service();
        let user = register(&service, "u1@example.com", "correcthorse").await;

        // first call initialises the stand-in hash; time the steady state
        let _ = service.login(None, "correcthorse", None).await;

        let started = std::time::Instant::now();
        let _ = service.login(Some(user), "batterystaple", None).await;
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        let _ = service.login(None, "batterystaple", None).await;
        let unknown_email = started.elapsed();

        assert!(
            unknown_email * 4 >= wrong_password,
            "unknown email took {:?}, wrong password took {:?}",
            unknown_email,
            wrong_password
        );
    }

    #[tokio::test]
    async fn test_failed_login_issues_no_refresh_token() {
        let service = service();
        let user = register(&service, "u1@example.com", "correcthorse").await;

        assert!(service.login(Some(user.clone()), "wrong", None).await.is_err());

        // Nothing was persisted, so revoking any random token finds nothing.
        let err = service
            .revoke_refresh_token(bearer(&crate::auth::generate_refresh_token()).as_deref())
            .await
            .unwrap_err();
        assert_eq!(auth_kind(err), Some(AuthError::TokenNotFound));
    }

    #[tokio::test]
    async fn test_refresh_with_unknown_token() {
        let service = service();
        let err = service
            .refresh_access_token(Some("Bearer 00ff"))
            .await
            .unwrap_err();
        assert_eq!(auth_kind(err), Some(AuthError::TokenNotFound));

        let err = service.refresh_access_token(None).await.unwrap_err();
        assert_eq!(auth_kind(err), Some(AuthError::MissingCredential));
    }

    #[tokio::test]
    async fn test_access_token_from_other_secret_is_rejected() {
        let service = service();
        let other = SessionService::new(
            Arc::new(InMemoryStore::new()),
            jwt_settings("another-instance-secret"),
            API_KEY.to_string(),
        );
        let user = register(&other, "u1@example.com", "correcthorse").await;
        let session = other.login(Some(user.clone()), "correcthorse", None).await.unwrap();

        assert_eq!(
            service.authenticate_request(bearer(&session.access_token).as_deref()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_access_token_ttl_is_bounded() {
        let service = service();

        assert_eq!(service.access_token_ttl(None), Duration::seconds(3600));
        assert_eq!(service.access_token_ttl(Some(60)), Duration::seconds(60));
        assert_eq!(service.access_token_ttl(Some(3600)), Duration::seconds(3600));
        assert_eq!(service.access_token_ttl(Some(0)), Duration::seconds(3600));
        assert_eq!(service.access_token_ttl(Some(-5)), Duration::seconds(3600));
        assert_eq!(service.access_token_ttl(Some(86_400)), Duration::seconds(3600));
    }

    #[test]
    fn test_authenticate_privileged() {
        let service = service();

        assert_eq!(
            service.authenticate_privileged(Some(format!("ApiKey {}", API_KEY).as_str())),
            Ok(())
        );
        assert_eq!(
            service.authenticate_privileged(Some("ApiKey nope")),
            Err(AuthError::Unauthorized)
        );
        assert_eq!(service.authenticate_privileged(None), Err(AuthError::Unauthorized));
    }
}
