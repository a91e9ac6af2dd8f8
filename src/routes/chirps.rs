//! Chirp Routes
//!
//! Reads are public. Posting and deleting run behind `JwtMiddleware`, and a
//! chirp can only be deleted by its author.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionService;
use crate::error::{AppError, DatabaseError, ErrorContext, ValidationError};
use crate::logger::RequestId;
use crate::middleware::AuthenticatedUser;
use crate::store::ChirpRecord;
use crate::validators::is_valid_chirp;

/// Body of `POST /api/chirps`
#[derive(Deserialize)]
pub struct ChirpRequest {
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ChirpResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

impl From<ChirpRecord> for ChirpResponse {
    fn from(chirp: ChirpRecord) -> Self {
        Self {
            id: chirp.id,
            created_at: chirp.created_at,
            updated_at: chirp.updated_at,
            body: chirp.body,
            user_id: chirp.user_id,
        }
    }
}

/// Query string of `GET /api/chirps`
#[derive(Deserialize)]
pub struct ChirpQuery {
    pub author_id: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Absent or empty means ascending.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw {
            None | Some("") | Some("asc") => Ok(SortOrder::Asc),
            Some("desc") => Ok(SortOrder::Desc),
            Some(_) => Err(ValidationError::InvalidFormat("sort".to_string())),
        }
    }
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidFormat(field.to_string()))
}

fn chirp_not_found() -> AppError {
    DatabaseError::NotFound("Chirp not found".to_string()).into()
}

/// POST /api/chirps
///
/// # Errors
/// - 400: empty body or longer than 140 characters
/// - 401: missing or invalid access token (from the middleware)
pub async fn create_chirp(
    form: web::Json<ChirpRequest>,
    user: web::ReqData<AuthenticatedUser>,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();
    let context = ErrorContext::new("chirp_create")
        .with_request_id(request_id.into_inner())
        .with_user_id(user_id.to_string());

    is_valid_chirp(&form.body)?;
    let chirp = session.store().create_chirp(user_id, &form.body).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = ?context.user_id,
        chirp_id = %chirp.id,
        "Chirp created"
    );

    Ok(HttpResponse::Created().json(ChirpResponse::from(chirp)))
}

/// GET /api/chirps?author_id=<uuid>&sort=asc|desc
///
/// # Errors
/// - 400: `author_id` is not a UUID or `sort` is neither `asc` nor `desc`
pub async fn list_chirps(
    query: web::Query<ChirpQuery>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let author_id = match query.author_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(parse_uuid(raw, "author_id")?),
    };
    let order = SortOrder::parse(query.sort.as_deref())?;

    let mut chirps = session.store().list_chirps(author_id).await?;
    if order == SortOrder::Desc {
        chirps.reverse();
    }

    let chirps: Vec<ChirpResponse> = chirps.into_iter().map(ChirpResponse::from).collect();
    Ok(HttpResponse::Ok().json(chirps))
}

/// GET /api/chirps/{chirp_id}
///
/// # Errors
/// - 400: malformed id
/// - 404: no such chirp
pub async fn get_chirp(
    path: web::Path<String>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let chirp_id = parse_uuid(&path.into_inner(), "chirp id")?;

    let chirp = session
        .store()
        .find_chirp(chirp_id)
        .await?
        .ok_or_else(chirp_not_found)?;

    Ok(HttpResponse::Ok().json(ChirpResponse::from(chirp)))
}

/// DELETE /api/chirps/{chirp_id}
///
/// # Errors
/// - 400: malformed id
/// - 401: missing or invalid access token (from the middleware)
/// - 403: the caller is not the author
/// - 404: no such chirp
pub async fn delete_chirp(
    path: web::Path<String>,
    user: web::ReqData<AuthenticatedUser>,
    session: web::Data<SessionService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();
    let context = ErrorContext::new("chirp_delete")
        .with_request_id(request_id.into_inner())
        .with_user_id(user_id.to_string());
    let chirp_id = parse_uuid(&path.into_inner(), "chirp id")?;

    let chirp = session
        .store()
        .find_chirp(chirp_id)
        .await?
        .ok_or_else(chirp_not_found)?;

    if chirp.user_id != user_id {
        return Err(AppError::Forbidden(format!(
            "user {} does not own chirp {}",
            user_id, chirp_id
        )));
    }

    if !session.store().delete_chirp(chirp_id).await? {
        return Err(chirp_not_found());
    }

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = ?context.user_id,
        chirp_id = %chirp_id,
        "Chirp deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
