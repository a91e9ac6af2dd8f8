/// JWT Claims structure
///
/// The access token payload: issuer tag, subject (user id), issued-at and
/// expiry. Nothing else is carried or trusted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Timestamps have one-second resolution, so two tokens issued for the
    /// same user and ttl within the same second are byte-identical.
    pub fn new(user_id: Uuid, issuer: String, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: issuer,
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
        }
    }

    /// # Errors
    /// `TokenMalformed` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenMalformed)
    }

    /// Expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
