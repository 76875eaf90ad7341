//! Router-wide middleware.
//!
//! Applied in production order: request id generation outermost, then a
//! request timeout, then tracing. CORS is not part of this stack; it is a
//! per-route concern because individual routes may opt out.

use std::time::Duration;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Apply the standard middleware stack to a finished router.
pub(crate) fn apply_middleware_stack(router: Router) -> Router {
    router
        // Request id generation (outermost)
        .layer(middleware::from_fn(set_request_id))
        // Request timeout
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        // Request tracing
        .layer(TraceLayer::new_for_http())
}

/// Create a permissive CORS layer for routes that have not opted out.
pub(crate) fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Tag request and response with a generated `x-request-id`.
async fn set_request_id(mut request: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");
    let id = Uuid::new_v4().to_string();
    let header_value =
        HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("unknown"));

    request
        .headers_mut()
        .insert(header_name.clone(), header_value.clone());
    let mut response = next.run(request).await;
    response.headers_mut().insert(header_name, header_value);
    response
}
