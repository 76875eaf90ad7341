//! The live request/response pairing one resolution pass works against.
//!
//! [`HttpExchange`] buffers every effect (headers, status, body) instead of
//! writing to the wire directly: the dispatch layer converts the buffer into
//! a transport response once resolution has finished. Buffering keeps the
//! resolution engine independent of the HTTP stack and makes effects easy to
//! assert on in tests.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::views::{ViewData, ViewEngine, ViewError};

/// Immutable request-side view handed to request handlers and custom
/// response handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub peer: Option<SocketAddr>,
    /// When dispatch first saw the request.
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    /// Parse the request body as JSON, if there is one.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer: None,
            received_at: Utc::now(),
        }
    }
}

/// The single body-producing effect of a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseBody {
    #[default]
    None,
    Text(String),
    Json(serde_json::Value),
    Page {
        path: String,
        data: Option<ViewData>,
    },
    Redirect(String),
}

/// Capability surface the resolution engine needs from a live HTTP call.
///
/// One exchange is exclusively owned by one resolution pass; exchanges are
/// never shared across concurrent requests.
pub trait Exchange: Send {
    fn request(&self) -> &RequestContext;
    fn set_header(&mut self, name: &str, value: &str);
    fn set_status(&mut self, status: StatusCode);
    fn send_text(&mut self, body: &str);
    fn send_json(&mut self, body: &serde_json::Value);
    fn render_page(&mut self, path: &str, data: Option<&ViewData>);
    fn redirect(&mut self, to: &str);
}

/// Buffering [`Exchange`] implementation backing the HTTP dispatch layer.
///
/// Headers are a set-keyed map: setting the same name twice overwrites
/// rather than accumulates. The body slot holds the latest body effect;
/// nested resolutions that emit a second body simply replace the first.
#[derive(Debug, Default)]
pub struct HttpExchange {
    request: RequestContext,
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: ResponseBody,
}

impl HttpExchange {
    pub fn new(request: RequestContext) -> Self {
        Self {
            request,
            status: None,
            headers: HeaderMap::new(),
            body: ResponseBody::None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Convert the buffered effects into a transport response, rendering a
    /// page body through the given view engine if one was requested.
    ///
    /// Descriptor-declared headers are applied after body-derived defaults,
    /// so an explicit `Content-Type` wins over the implied one. An explicit
    /// status wins over the implied one (notably the 302 a redirect body
    /// would otherwise carry).
    pub fn into_response(self, views: &dyn ViewEngine) -> Result<Response, ViewError> {
        let HttpExchange {
            status,
            headers,
            body,
            ..
        } = self;

        let mut response = match body {
            ResponseBody::None => ().into_response(),
            ResponseBody::Text(text) => Html(text).into_response(),
            ResponseBody::Json(value) => axum::Json(value).into_response(),
            ResponseBody::Page { path, data } => {
                Html(views.render(&path, data.as_ref())?).into_response()
            }
            ResponseBody::Redirect(to) => {
                let mut redirect = StatusCode::FOUND.into_response();
                match HeaderValue::from_str(&to) {
                    Ok(location) => {
                        redirect.headers_mut().insert(header::LOCATION, location);
                    }
                    Err(_) => warn!(location = %to, "redirect target is not a valid header value"),
                }
                redirect
            }
        };

        response.headers_mut().extend(headers);
        if let Some(status) = status {
            *response.status_mut() = status;
        }

        Ok(response)
    }
}

impl Exchange for HttpExchange {
    fn request(&self) -> &RequestContext {
        &self.request
    }

    fn set_header(&mut self, name: &str, value: &str) {
        let name = match HeaderName::try_from(name) {
            Ok(name) => name,
            Err(_) => {
                warn!(header = name, "ignoring invalid header name");
                return;
            }
        };
        let value = match HeaderValue::try_from(value) {
            Ok(value) => value,
            Err(_) => {
                warn!(header = %name, "ignoring invalid header value");
                return;
            }
        };
        self.headers.insert(name, value);
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn send_text(&mut self, body: &str) {
        self.body = ResponseBody::Text(body.to_string());
    }

    fn send_json(&mut self, body: &serde_json::Value) {
        self.body = ResponseBody::Json(body.clone());
    }

    fn render_page(&mut self, path: &str, data: Option<&ViewData>) {
        self.body = ResponseBody::Page {
            path: path.to_string(),
            data: data.cloned(),
        };
    }

    fn redirect(&mut self, to: &str) {
        self.body = ResponseBody::Redirect(to.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::RawViews;

    fn exchange() -> HttpExchange {
        HttpExchange::new(RequestContext::default())
    }

    fn raw_views() -> RawViews {
        RawViews::new("views")
    }

    #[test]
    fn headers_overwrite_instead_of_accumulating() {
        let mut exchange = exchange();
        exchange.set_header("x-tag", "first");
        exchange.set_header("x-tag", "second");

        assert_eq!(exchange.headers().len(), 1);
        assert_eq!(exchange.headers()["x-tag"], "second");
    }

    #[test]
    fn invalid_header_names_are_dropped() {
        let mut exchange = exchange();
        exchange.set_header("not a header\n", "value");
        assert!(exchange.headers().is_empty());
    }

    #[test]
    fn redirect_defaults_to_found() {
        let mut exchange = exchange();
        exchange.redirect("/elsewhere");

        let response = exchange.into_response(&raw_views()).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/elsewhere");
    }

    #[test]
    fn explicit_status_wins_over_redirect_default() {
        let mut exchange = exchange();
        exchange.set_status(StatusCode::MOVED_PERMANENTLY);
        exchange.redirect("/elsewhere");

        let response = exchange.into_response(&raw_views()).unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/elsewhere");
    }

    #[test]
    fn declared_content_type_wins_over_body_default() {
        let mut exchange = exchange();
        exchange.set_header("content-type", "text/plain");
        exchange.send_text("just text");

        let response = exchange.into_response(&raw_views()).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn json_body_sets_json_content_type() {
        let mut exchange = exchange();
        exchange.send_json(&serde_json::json!({"a": 1}));

        let response = exchange.into_response(&raw_views()).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn later_body_effects_replace_earlier_ones() {
        let mut exchange = exchange();
        exchange.send_text("outer");
        exchange.send_text("inner");

        assert_eq!(*exchange.body(), ResponseBody::Text("inner".to_string()));
    }

    #[test]
    fn request_json_body_parses_lazily() {
        let mut request = RequestContext::default();
        request.body = Bytes::from_static(b"{\"a\":1}");
        let exchange = HttpExchange::new(request);

        assert_eq!(
            exchange.request().json_body(),
            Some(serde_json::json!({"a": 1}))
        );
    }
}
