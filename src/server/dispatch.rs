//! Route dispatch: from a matched route to a finished transport response.
//!
//! This is the resolution engine's caller and failure channel. Each
//! request gets a fresh [`HttpExchange`]; once resolution finishes the
//! buffered effects become the response. Failures never leave a partial
//! body behind - they map to a structured error envelope instead.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::exchange::{HttpExchange, RequestContext};
use crate::manifest::RequestHandler;
use crate::response::{resolve, ResolveError, ResponseDescriptor};
use crate::views::{ViewEngine, ViewError};

/// Shared context captured by every route handler closure.
#[derive(Clone)]
pub(crate) struct DispatchState {
    pub views: Arc<dyn ViewEngine>,
    pub request_handlers: Arc<[RequestHandler]>,
    pub blacklist: Arc<[IpAddr]>,
    pub body_limit: usize,
}

/// Dispatch-level failures and their HTTP mapping.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("request origin {0} is blacklisted")]
    Blacklisted(IpAddr),

    #[error("request body exceeded the configured size limit")]
    BodyTooLarge,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    View(#[from] ViewError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            DispatchError::Blacklisted(_) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", "Access denied".to_string())
            }
            DispatchError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                self.to_string(),
            ),
            DispatchError::Resolve(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RESOLUTION_FAILED",
                "Internal server error".to_string(),
            ),
            DispatchError::View(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RENDER_FAILED",
                "Internal server error".to_string(),
            ),
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

/// Handle one matched request with the route's declared descriptor.
pub(crate) async fn dispatch(
    state: DispatchState,
    descriptor: Arc<ResponseDescriptor>,
    peer: Option<SocketAddr>,
    request: Request,
) -> Response {
    match run(state, descriptor, peer, request).await {
        Ok(response) => response,
        Err(dispatch_error) => {
            match &dispatch_error {
                DispatchError::Blacklisted(ip) => {
                    warn!(ip = %ip, "rejected blacklisted origin");
                }
                other => error!(error = %other, "request dispatch failed"),
            }
            dispatch_error.into_response()
        }
    }
}

async fn run(
    state: DispatchState,
    descriptor: Arc<ResponseDescriptor>,
    peer: Option<SocketAddr>,
    request: Request,
) -> Result<Response, DispatchError> {
    if let Some(peer) = peer {
        if state.blacklist.contains(&peer.ip()) {
            return Err(DispatchError::Blacklisted(peer.ip()));
        }
    }

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.body_limit)
        .await
        .map_err(|_| DispatchError::BodyTooLarge)?;

    let context = RequestContext {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
        peer,
        received_at: chrono::Utc::now(),
    };
    debug!(method = %context.method, uri = %context.uri, "dispatching request");

    for handler in state.request_handlers.iter() {
        handler(&context);
    }

    let mut exchange = HttpExchange::new(context);
    resolve(&descriptor, &mut exchange, false).await?;

    Ok(exchange.into_response(state.views.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::RawViews;
    use axum::body::Body;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state() -> DispatchState {
        DispatchState {
            views: Arc::new(RawViews::new("views")),
            request_handlers: Arc::from(Vec::new()),
            blacklist: Arc::from(Vec::new()),
            body_limit: 1024,
        }
    }

    fn request() -> Request {
        Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn blacklisted_peers_get_a_403_envelope() {
        let mut state = state();
        state.blacklist = Arc::from(vec!["10.0.0.9".parse::<IpAddr>().unwrap()]);
        let descriptor = Arc::new(ResponseDescriptor::text("never"));
        let peer: SocketAddr = "10.0.0.9:55000".parse().unwrap();

        let response = dispatch(state, descriptor, Some(peer), request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_peers_pass_the_blacklist() {
        let mut state = state();
        state.blacklist = Arc::from(vec!["10.0.0.9".parse::<IpAddr>().unwrap()]);
        let descriptor = Arc::new(ResponseDescriptor::text("served"));
        let peer: SocketAddr = "192.168.1.4:55000".parse().unwrap();

        let response = dispatch(state, descriptor, Some(peer), request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_handlers_observe_before_resolution() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);

        let mut state = state();
        let observer: RequestHandler = Arc::new(|context| {
            assert_eq!(context.uri.path(), "/test");
            SEEN.fetch_add(1, Ordering::SeqCst);
        });
        state.request_handlers = Arc::from(vec![observer]);
        let descriptor = Arc::new(ResponseDescriptor::text("ok"));

        dispatch(state, descriptor, None, request()).await;
        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_failures_become_a_500_envelope() {
        let descriptor = Arc::new(ResponseDescriptor::custom(|_| Err("boom".into())));

        let response = dispatch(state(), descriptor, None, request()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let envelope: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope["error"]["code"], "RESOLUTION_FAILED");
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let mut state = state();
        state.body_limit = 4;
        let descriptor = Arc::new(ResponseDescriptor::text("ok"));
        let request = Request::builder()
            .uri("/test")
            .body(Body::from("way more than four bytes"))
            .unwrap();

        let response = dispatch(state, descriptor, None, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
