/// User Routes
///
/// Account creation and self-service updates of email and password.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionService;
use crate::error::{AppError, ErrorContext};
use crate::logger::RequestId;
use crate::middleware::AuthenticatedUser;
use crate::store::UserRecord;
use crate::validators::{is_valid_email, is_valid_password};

/// Body of `POST /api/users` and `PUT /api/users`
#[derive(Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user. The password hash never leaves the store.
#[derive(Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_premium: bool,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            is_premium: user.is_premium,
        }
    }
}

/// POST /api/users
///
/// # Errors
/// - 400: invalid email or empty/oversized password
/// - 409: email already registered
/// - 500: hashing or database failure
pub async fn create_user(
    form: web::Json<UserRequest>,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration").with_request_id(request_id.into_inner());

    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;
    let hashed_password = session.create_credential(&form.password).await?;

    let user = session.store().create_user(&email, &hashed_password).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %user.id,
        "User registered"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// PUT /api/users
///
/// Requires `Authorization: Bearer <access_token>`; the middleware has
/// already authenticated the caller.
pub async fn update_user(
    form: web::Json<UserRequest>,
    user: web::ReqData<AuthenticatedUser>,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();
    let context = ErrorContext::new("user_update")
        .with_request_id(request_id.into_inner())
        .with_user_id(user_id.to_string());

    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;
    let hashed_password = session.create_credential(&form.password).await?;

    let updated = session
        .store()
        .update_user(user_id, &email, &hashed_password)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = ?context.user_id,
        "User updated"
    );

    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}
