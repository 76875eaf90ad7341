//! Declarative response model.
//!
//! A [`ResponseDescriptor`] describes what a route should answer with,
//! before any live request exists: a body-producing variant plus three
//! optional attributes shared by every variant (headers, status, delay).
//! Descriptors are immutable once constructed; the resolution engine in
//! [`resolver`](crate::response::resolver) only ever reads them.
//!
//! Each variant gets its own constructor, so a descriptor's shape is fixed
//! at construction time. Un-tagged JSON literals (from manifest files) are
//! classified into a variant by [`classify`](crate::response::classify).

pub mod classify;
pub mod resolver;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::exchange::Exchange;
use crate::views::ViewData;

pub use classify::{classify, is_base_valid, Kind, CLASSIFICATION_ORDER};
pub use resolver::{resolve, Continuation, ResolveError};

/// Error type a custom handler may fail with. Propagated to the dispatch
/// layer untouched; the resolution engine never retries.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a custom handler produces: a follow-up descriptor to resolve next,
/// or nothing when the handler already produced its effects directly.
pub type HandlerOutcome = Result<Option<ResponseDescriptor>, HandlerError>;

/// Synchronous custom handler.
pub type CustomHandler = Arc<dyn Fn(&mut dyn Exchange) -> HandlerOutcome + Send + Sync>;

/// Asynchronous custom handler: invoked synchronously, supplies its outcome
/// later through the single-shot [`Continuation`].
pub type AsyncHandler = Arc<dyn Fn(&mut dyn Exchange, Continuation) + Send + Sync>;

/// Lazy delay producer, evaluated when resolution reaches the delay gate.
pub type DelayFn = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Fixed or lazily computed resolution delay.
#[derive(Clone)]
pub enum Delay {
    Fixed(Duration),
    Lazy(DelayFn),
}

impl Delay {
    /// Evaluate the delay to a concrete duration.
    pub fn duration(&self) -> Duration {
        match self {
            Delay::Fixed(duration) => *duration,
            Delay::Lazy(producer) => producer(),
        }
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Fixed(duration) => f.debug_tuple("Fixed").field(duration).finish(),
            Delay::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// The body-producing variant of a descriptor.
#[derive(Clone)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
    Page {
        path: String,
        data: Option<ViewData>,
    },
    Redirect {
        to: String,
    },
    Custom(CustomHandler),
    Async(AsyncHandler),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Payload::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Payload::Page { path, data } => f
                .debug_struct("Page")
                .field("path", path)
                .field("data", data)
                .finish(),
            Payload::Redirect { to } => f.debug_struct("Redirect").field("to", to).finish(),
            Payload::Custom(_) => f.write_str("Custom(..)"),
            Payload::Async(_) => f.write_str("Async(..)"),
        }
    }
}

/// A declarative description of one HTTP response.
///
/// Construct with a variant constructor, then chain `with_*` attribute
/// builders:
///
/// ```
/// use axum::http::StatusCode;
/// use manifest_http::ResponseDescriptor;
///
/// let created = ResponseDescriptor::text("<h1>done</h1>")
///     .with_status(StatusCode::CREATED)
///     .with_header("x-source", "manifest");
/// ```
#[derive(Clone, Debug)]
pub struct ResponseDescriptor {
    headers: Option<HashMap<String, String>>,
    status: Option<StatusCode>,
    delay: Option<Delay>,
    payload: Payload,
}

impl ResponseDescriptor {
    fn from_payload(payload: Payload) -> Self {
        Self {
            headers: None,
            status: None,
            delay: None,
            payload,
        }
    }

    /// A response that writes the given text verbatim.
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_payload(Payload::Text(text.into()))
    }

    /// A response that serializes the given value as JSON.
    pub fn json(json: impl Into<serde_json::Value>) -> Self {
        Self::from_payload(Payload::Json(json.into()))
    }

    /// A response rendered from the template at `path`, with an optional
    /// template context.
    pub fn page(path: impl Into<String>, data: Option<ViewData>) -> Self {
        Self::from_payload(Payload::Page {
            path: path.into(),
            data,
        })
    }

    /// A redirect to the given target.
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::from_payload(Payload::Redirect { to: to.into() })
    }

    /// A response computed by a synchronous handler. The handler may return
    /// a follow-up descriptor, which is resolved in its place.
    pub fn custom(
        handler: impl Fn(&mut dyn Exchange) -> HandlerOutcome + Send + Sync + 'static,
    ) -> Self {
        Self::from_payload(Payload::Custom(Arc::new(handler)))
    }

    /// A response computed by an asynchronous handler, which supplies its
    /// outcome through the continuation it is handed.
    pub fn async_custom(
        handler: impl Fn(&mut dyn Exchange, Continuation) + Send + Sync + 'static,
    ) -> Self {
        Self::from_payload(Payload::Async(Arc::new(handler)))
    }

    /// Set the response status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Add one response header. Repeated names overwrite.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Delay resolution by a fixed duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(Delay::Fixed(delay));
        self
    }

    /// Delay resolution by a duration computed when the delay gate runs.
    pub fn with_delay_fn(mut self, producer: impl Fn() -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Delay::Lazy(Arc::new(producer)));
        self
    }

    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn delay(&self) -> Option<&Delay> {
        self.delay.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Which variant this descriptor was constructed as.
    pub fn kind(&self) -> Kind {
        match self.payload {
            Payload::Async(_) => Kind::Async,
            Payload::Custom(_) => Kind::Custom,
            Payload::Text(_) => Kind::Text,
            Payload::Json(_) => Kind::Json,
            Payload::Page { .. } => Kind::Page,
            Payload::Redirect { .. } => Kind::Redirect,
        }
    }
}
