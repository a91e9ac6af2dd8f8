/// Credential extraction from the `Authorization` header.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

const BEARER_SCHEME: &str = "Bearer ";
const API_KEY_SCHEME: &str = "ApiKey ";

/// Raw `Authorization` header value, if present and valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// `<scheme><credential>` with exactly one space after the scheme name and
/// no whitespace inside or around the credential.
fn strip_scheme<'a>(authorization: Option<&'a str>, scheme: &str) -> Option<&'a str> {
    authorization
        .and_then(|value| value.strip_prefix(scheme))
        .filter(|credential| !credential.is_empty() && !credential.contains(char::is_whitespace))
}

/// Extract the token from `Bearer <token>`.
///
/// # Errors
/// `MissingCredential` if the header is absent or uses any other scheme
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, AuthError> {
    strip_scheme(authorization, BEARER_SCHEME).ok_or(AuthError::MissingCredential)
}

/// Extract the key from `ApiKey <key>`.
///
/// # Errors
/// `MissingCredential` if the header is absent or uses any other scheme
pub fn extract_api_key(authorization: Option<&str>) -> Result<&str, AuthError> {
    strip_scheme(authorization, API_KEY_SCHEME).ok_or(AuthError::MissingCredential)
}

/// Check the `ApiKey` credential against the configured key in constant time.
/// A missing and a wrong key are indistinguishable: both are `Unauthorized`.
pub fn verify_api_key(authorization: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let presented = extract_api_key(authorization).map_err(|_| AuthError::Unauthorized)?;

    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_malformed_bearer_headers() {
        let malformed = vec![
            None,
            Some(""),
            Some("Bearer"),
            Some("Bearer "),
            Some("BearerToken"),
            Some("bearer abc"),
            Some("Basic dXNlcjpwYXNz"),
            Some("ApiKey abc"),
            Some("Bearer  abc"),
            Some("Bearer abc "),
            Some("Bearer abc def"),
            Some("Bearer\tabc"),
        ];

        for header in malformed {
            assert_eq!(
                extract_bearer(header),
                Err(AuthError::MissingCredential),
                "Should reject header: {:?}",
                header
            );
        }
    }

    #[test]
    fn test_extract_api_key() {
        assert_eq!(extract_api_key(Some("ApiKey f271c81f")), Ok("f271c81f"));
        assert_eq!(extract_api_key(Some("Bearer f271c81f")), Err(AuthError::MissingCredential));
        assert_eq!(extract_api_key(Some("ApiKey  f271c81f")), Err(AuthError::MissingCredential));
    }

    #[test]
    fn test_verify_api_key() {
        assert_eq!(verify_api_key(Some("ApiKey secret-key"), "secret-key"), Ok(()));
        assert_eq!(
            verify_api_key(Some("ApiKey wrong-key"), "secret-key"),
            Err(AuthError::Unauthorized)
        );
        assert_eq!(verify_api_key(None, "secret-key"), Err(AuthError::Unauthorized));
        assert_eq!(
            verify_api_key(Some("ApiKey secret"), "secret-key"),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn test_authorization_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(authorization_header(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        assert_eq!(authorization_header(&headers), Some("Bearer token"));
    }
}
