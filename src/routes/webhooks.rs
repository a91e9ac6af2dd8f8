//! Payment provider webhook
//!
//! Authenticated by the shared `ApiKey`, not by a user session. Events other
//! than `user.upgraded` are acknowledged and ignored so new event types from
//! the provider never fail delivery.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{authorization_header, SessionService};
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::logger::RequestId;

pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Deserialize)]
struct UpgradeData {
    user_id: Uuid,
}

/// POST /api/polka/webhooks
///
/// The API key is checked before the body is parsed, so a wrong key is
/// always 401 whatever the payload.
///
/// # Errors
/// - 401: missing or wrong API key
/// - 400: body is not a valid event
/// - 404: `user.upgraded` for an unknown user
pub async fn handle_webhook(
    req: HttpRequest,
    body: web::Bytes,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    session.authenticate_privileged(authorization_header(req.headers()))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| ValidationError::InvalidFormat("webhook event".to_string()))?;

    if event.event != USER_UPGRADED_EVENT {
        tracing::info!(
            request_id = %request_id.as_str(),
            event = %event.event,
            "Ignoring webhook event"
        );
        return Ok(HttpResponse::NoContent().finish());
    }

    let data: UpgradeData = serde_json::from_value(event.data)
        .map_err(|_| ValidationError::InvalidFormat("webhook data".to_string()))?;

    session
        .store()
        .upgrade_user(data.user_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

    tracing::info!(
        request_id = %request_id.as_str(),
        user_id = %data.user_id,
        "User upgraded to premium"
    );
    Ok(HttpResponse::NoContent().finish())
}
