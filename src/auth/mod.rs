/// Authentication module
///
/// Password hashing, access token issuance/validation, refresh token
/// lifecycle, credential extraction, and the session orchestration on top.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::Claims;
pub use credentials::{authorization_header, extract_api_key, extract_bearer, verify_api_key};
pub use jwt::{
    issue_access_token, issue_access_token_at, validate_access_token, validate_access_token_at,
};
pub use password::{
    hash_password, hash_password_blocking, verify_dummy_password_blocking, verify_password,
    verify_password_blocking,
};
pub use refresh_token::{
    generate_refresh_token, issue_refresh_token, issue_refresh_token_with_expiry,
    resolve_refresh_token, resolve_refresh_token_at, revoke_refresh_token,
    REFRESH_TOKEN_LIFETIME_DAYS,
};
pub use session::{IssuedSession, SessionService};
