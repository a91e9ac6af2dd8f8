/// Authentication Routes
///
/// Login, access token refresh, and refresh token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{authorization_header, SessionService};
use crate::error::{AppError, ErrorContext};
use crate::logger::RequestId;
use crate::routes::users::UserResponse;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Requested access token lifetime; honoured only within (0, 3600]
    pub expires_in_seconds: Option<i64>,
}

/// Login response: the user plus both tokens
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    token: String,
}

/// POST /api/login
///
/// # Errors
/// - 401: unknown email or wrong password (identical responses)
/// - 500: hashing or database failure
pub async fn login(
    form: web::Json<LoginRequest>,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login").with_request_id(request_id.into_inner());

    let user = session
        .store()
        .find_user_by_email(form.email.trim())
        .await?;

    let issued = session
        .login(user, &form.password, form.expires_in_seconds)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %issued.user.id,
        "Login succeeded"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(&issued.user),
        token: issued.access_token,
        refresh_token: issued.refresh_token,
    }))
}

/// POST /api/refresh
///
/// Requires `Authorization: Bearer <refresh_token>`. The refresh token is not
/// rotated and remains usable until it expires or is revoked.
///
/// # Errors
/// - 401: missing, unknown, expired or revoked refresh token (one uniform response)
pub async fn refresh(
    req: HttpRequest,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh").with_request_id(request_id.into_inner());

    let token = session
        .refresh_access_token(authorization_header(req.headers()))
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        "Access token issued from refresh token"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// Requires `Authorization: Bearer <refresh_token>`.
///
/// # Errors
/// - 401: missing or unknown refresh token
pub async fn revoke(
    req: HttpRequest,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_revoke").with_request_id(request_id.into_inner());

    session
        .revoke_refresh_token(authorization_header(req.headers()))
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        "Refresh token revoked"
    );

    Ok(HttpResponse::NoContent().finish())
}
