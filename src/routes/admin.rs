use actix_web::{web, HttpResponse};

use crate::auth::SessionService;
use crate::configuration::Platform;
use crate::error::AppError;
use crate::logger::RequestId;

/// POST /admin/reset
///
/// Deletes every user with their chirps and refresh tokens. Only allowed on the `dev` platform.
pub async fn reset(
    platform: web::Data<Platform>,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    if !platform.allows_reset() {
        return Err(AppError::Forbidden(format!(
            "reset is disabled on platform {:?}",
            platform.get_ref()
        )));
    }

    session.store().reset_users().await?;
    tracing::warn!(request_id = %request_id.as_str(), "All users, chirps and refresh tokens deleted");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user_count": 0 })))
}
