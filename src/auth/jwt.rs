/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed with the shared secret. HS256 is the only
/// algorithm ever accepted: a token whose header names any other algorithm
/// fails validation before its claims are looked at.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issue an access token for `user_id` valid for `ttl` from now.
///
/// # Errors
/// Returns error if token encoding fails
pub fn issue_access_token(
    user_id: Uuid,
    config: &JwtSettings,
    ttl: Duration,
) -> Result<String, AppError> {
    issue_access_token_at(user_id, config, ttl, Utc::now())
}

/// Issue an access token as if the current time were `now`.
pub fn issue_access_token_at(
    user_id: Uuid,
    config: &JwtSettings,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, config.issuer.clone(), now, ttl);

    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return the authenticated user id.
///
/// # Errors
/// - `TokenInvalid` if the signature, algorithm or issuer does not match
/// - `TokenMalformed` if the token or its claims cannot be parsed
/// - `TokenExpired` if the current time is at or past `exp`
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Uuid, AuthError> {
    validate_access_token_at(token, config, Utc::now())
}

/// Validate an access token as if the current time were `now`.
pub fn validate_access_token_at(
    token: &str,
    config: &JwtSettings,
    now: DateTime<Utc>,
) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    // Expiry is checked below against `now`, with no leeway.
    validation.validate_exp = false;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT validation error");
        match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidIssuer => AuthError::TokenInvalid,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => AuthError::TokenMalformed,
            _ => AuthError::TokenInvalid,
        }
    })?;

    if claims.is_expired_at(now) {
        return Err(AuthError::TokenExpired);
    }

    claims.user_id()
}
