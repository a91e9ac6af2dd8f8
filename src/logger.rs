use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use log::{info, warn};
use std::rc::Rc;
use std::time::Instant;

use crate::error::AppError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INBOUND_REQUEST_ID_LEN: usize = 64;

/// Id of the current request, shared by the access log, handler logs, the
/// `x-request-id` response header and the `error_id` of error bodies.
///
/// `LoggerMiddleware` places it in the request extensions; handlers take it
/// as an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromRequest for RequestId {
    type Error = Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Outside LoggerMiddleware (e.g. a bare test App) fall back to a fresh id
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(uuid::Uuid::new_v4().to_string()));
        std::future::ready(Ok(request_id))
    }
}

/// Request logging middleware.
///
/// Tags every request with an id (reusing an inbound `x-request-id` if the
/// client sent one), renders `AppError`s under that id, echoes it on the
/// response, and logs method, path, status and latency. Query strings and
/// headers are not logged since they can carry credentials.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

fn render_app_error(
    error: &AppError,
    request: HttpRequest,
    request_id: &str,
) -> ServiceResponse {
    ServiceResponse::new(request, error.to_http_response(request_id))
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|id| !id.is_empty() && id.len() <= MAX_INBOUND_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        req.extensions_mut().insert(RequestId(request_id.clone()));
        let http_request = req.request().clone();

        info!("[{}] {} {} started", request_id, method, path);

        let service = self.service.clone();

        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => {
                    // Handler errors already became responses; re-render ours under this id
                    let rendered = res
                        .response()
                        .error()
                        .and_then(|e| e.as_error::<AppError>())
                        .map(|e| render_app_error(e, res.request().clone(), &request_id));
                    match rendered {
                        Some(rendered) => rendered.map_into_right_body(),
                        None => res.map_into_left_body(),
                    }
                }
                // Middleware rejections (e.g. JwtMiddleware) arrive as errors
                Err(e) => match e.as_error::<AppError>() {
                    Some(app_error) => {
                        render_app_error(app_error, http_request, &request_id).map_into_right_body()
                    }
                    None => ServiceResponse::from_err(e, http_request).map_into_right_body(),
                },
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            let status = res.status();
            let elapsed = start_time.elapsed().as_millis();
            if status.is_server_error() {
                warn!("[{}] {} {} -> {} ({}ms)", request_id, method, path, status.as_u16(), elapsed);
            } else {
                info!("[{}] {} {} -> {} ({}ms)", request_id, method, path, status.as_u16(), elapsed);
            }

            Ok(res)
        })
    }
}
