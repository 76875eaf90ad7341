#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Manifest HTTP
//!
//! A declarative HTTP server core: describe a server as data - a manifest
//! of routes, static locations and options - instead of writing imperative
//! handler code, and let a small resolution engine turn each declared
//! response into wire effects.
//!
//! ## Overview
//!
//! The interesting part is the response model and its resolution engine.
//! A route declares one [`ResponseDescriptor`] per HTTP method: plain text,
//! JSON, a rendered page, a redirect, a fixed delay, or a custom/async
//! handler that itself produces another descriptor. Resolution applies the
//! shared attributes (delay, headers, status) and then dispatches on the
//! variant, recursing when a handler hands back a follow-up descriptor.
//!
//! Everything around that engine is deliberately thin glue over the
//! ecosystem: axum carries the transport and routing, tower-http serves
//! static files and CORS, and page rendering hides behind the
//! [`ViewEngine`] seam.
//!
//! ## Module Organization
//!
//! - [`response`] - descriptor model, literal classification, resolution engine
//! - [`exchange`] - the live request/response pairing resolution works against
//! - [`route`] - URL pattern plus per-method response slots
//! - [`manifest`] - the manifest model, JSON loading, process-wide defaults
//! - [`server`] - router construction and the listening server
//! - [`views`] - the view engine seam for page responses
//! - [`error`] - structured error handling
//! - [`logging`] - tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use manifest_http::{App, Manifest, ResponseDescriptor, Route};
//!
//! #[tokio::main]
//! async fn main() -> manifest_http::Result<()> {
//!     manifest_http::init_logging();
//!
//!     let mut manifest = Manifest::default();
//!     manifest.server.port = 8080;
//!     manifest.api.routes = vec![
//!         Route::new("/hello").get(ResponseDescriptor::text("<h1>hello</h1>")),
//!         Route::new("/status").get(ResponseDescriptor::json(serde_json::json!({
//!             "ok": true
//!         }))),
//!     ];
//!
//!     App::new(manifest)?.start().await
//! }
//! ```

pub mod error;
pub mod exchange;
pub mod logging;
pub mod manifest;
pub mod response;
pub mod route;
pub mod server;
pub mod views;

pub use error::{ManifestError, Result};
pub use exchange::{Exchange, HttpExchange, RequestContext, ResponseBody};
pub use logging::init_logging;
pub use manifest::store::{default_manifest, set_default_manifest};
pub use manifest::{
    ApiOptions, Blacklist, Manifest, PreSetupHook, RequestHandler, ServerOptions, StaticLocation,
    ViewOptions,
};
pub use response::classify::{classify, is_base_valid, ClassifyError, Kind, CLASSIFICATION_ORDER};
pub use response::resolver::{resolve, Continuation, ResolveError, MAX_CHAIN_DEPTH};
pub use response::{
    AsyncHandler, CustomHandler, Delay, DelayFn, HandlerError, HandlerOutcome, Payload,
    ResponseDescriptor,
};
pub use route::{MethodResponses, Route, CATCH_ALL};
pub use server::App;
pub use views::{RawViews, ViewData, ViewEngine, ViewError};
