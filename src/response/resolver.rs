//! The response resolution engine.
//!
//! [`resolve`] turns one [`ResponseDescriptor`] plus one live
//! [`Exchange`] into observable effects, in a fixed order per pass:
//!
//! 1. delay gate (outermost descriptor only)
//! 2. headers
//! 3. status
//! 4. variant dispatch
//!
//! Custom and async handlers may hand back a follow-up descriptor, which
//! re-enters the loop in place of the current one. Follow-up descriptors
//! never wait: their own `delay`, if any, is intentionally discarded - only
//! the descriptor the route declared gets to stall the response. Their
//! headers and status are applied on top of whatever the outer pass already
//! wrote, so an outer `{headers: {h1}}` plus an inner `{headers: {h2}}`
//! lands both on the wire.
//!
//! The delay gate is the only suspension point: it parks the resolution on
//! the timer without blocking a worker thread. Dropping the resolution
//! future (for example when the client goes away) cancels a pending delay;
//! nothing else in the engine holds resources across the wait.

use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::{Payload, ResponseDescriptor};
use crate::exchange::Exchange;

/// Upper bound on handler-produced descriptor chains. A chain this deep is
/// a handler recursing on itself, not a real response pipeline.
pub const MAX_CHAIN_DEPTH: usize = 32;

/// Errors a resolution pass can fail with. Either way the dispatch layer
/// decides the user-visible outcome; the engine never writes a partial
/// fallback body itself.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("response chain exceeded {MAX_CHAIN_DEPTH} nested descriptors")]
    ChainTooDeep,

    #[error("custom handler failed: {0}")]
    Handler(#[source] super::HandlerError),
}

/// Single-shot completion handle for asynchronous handlers.
///
/// The handler moves the continuation into whatever task eventually knows
/// the outcome and calls [`complete`](Continuation::complete) exactly once;
/// taking `self` by value makes a second call unrepresentable. Dropping the
/// continuation without completing it ends the resolution with no further
/// effect.
pub struct Continuation {
    tx: oneshot::Sender<Option<ResponseDescriptor>>,
}

impl Continuation {
    fn channel() -> (Self, oneshot::Receiver<Option<ResponseDescriptor>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Supply the handler's outcome: a follow-up descriptor to resolve, or
    /// `None` when the handler already produced its effects directly.
    pub fn complete(self, next: Option<ResponseDescriptor>) {
        if self.tx.send(next).is_err() {
            debug!("continuation completed after its resolution was dropped");
        }
    }
}

/// What the variant dispatch decided to do next.
enum Flow {
    Done,
    Continue(ResponseDescriptor),
}

/// Resolve one descriptor against one exchange.
///
/// `ignore_delay` skips the delay gate; route dispatch always passes
/// `false`, and the engine itself forces `true` for every handler-produced
/// follow-up descriptor.
pub async fn resolve(
    descriptor: &ResponseDescriptor,
    exchange: &mut dyn Exchange,
    ignore_delay: bool,
) -> Result<(), ResolveError> {
    let mut follow_up: Option<ResponseDescriptor> = None;
    let mut ignore_delay = ignore_delay;
    let mut depth = 0usize;

    loop {
        let current = follow_up.as_ref().unwrap_or(descriptor);

        if !ignore_delay {
            if let Some(delay) = current.delay() {
                let wait = delay.duration();
                trace!(wait_ms = wait.as_millis() as u64, "delaying resolution");
                tokio::time::sleep(wait).await;
                ignore_delay = true;
            }
        }

        if let Some(headers) = current.headers() {
            for (name, value) in headers {
                exchange.set_header(name, value);
            }
        }

        if let Some(status) = current.status() {
            exchange.set_status(status);
        }

        let flow = match current.payload() {
            Payload::Text(text) => {
                exchange.send_text(text);
                Flow::Done
            }
            Payload::Json(value) => {
                exchange.send_json(value);
                Flow::Done
            }
            Payload::Page { path, data } => {
                exchange.render_page(path, data.as_ref());
                Flow::Done
            }
            Payload::Redirect { to } => {
                exchange.redirect(to);
                Flow::Done
            }
            Payload::Custom(handler) => {
                match handler(&mut *exchange).map_err(ResolveError::Handler)? {
                    Some(next) => Flow::Continue(next),
                    None => Flow::Done,
                }
            }
            Payload::Async(handler) => {
                let (continuation, completed) = Continuation::channel();
                handler(&mut *exchange, continuation);
                match completed.await {
                    Ok(Some(next)) => Flow::Continue(next),
                    Ok(None) => Flow::Done,
                    Err(_) => {
                        debug!("async handler dropped its continuation without completing");
                        Flow::Done
                    }
                }
            }
        };

        match flow {
            Flow::Done => return Ok(()),
            Flow::Continue(next) => {
                depth += 1;
                if depth > MAX_CHAIN_DEPTH {
                    return Err(ResolveError::ChainTooDeep);
                }
                // Follow-up descriptors never wait.
                ignore_delay = true;
                follow_up = Some(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{HttpExchange, RequestContext, ResponseBody};
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn exchange() -> HttpExchange {
        HttpExchange::new(RequestContext::default())
    }

    #[tokio::test]
    async fn text_descriptor_sets_status_and_body() {
        let descriptor =
            ResponseDescriptor::text("hello").with_status(StatusCode::CREATED);
        let mut exchange = exchange();

        tokio_test::assert_ok!(resolve(&descriptor, &mut exchange, false).await);

        assert_eq!(exchange.status(), Some(StatusCode::CREATED));
        assert_eq!(*exchange.body(), ResponseBody::Text("hello".to_string()));
    }

    #[tokio::test]
    async fn json_descriptor_buffers_the_value() {
        let descriptor = ResponseDescriptor::json(json!({"a": 1}));
        let mut exchange = exchange();

        tokio_test::assert_ok!(resolve(&descriptor, &mut exchange, false).await);

        assert_eq!(*exchange.body(), ResponseBody::Json(json!({"a": 1})));
    }

    #[tokio::test]
    async fn redirect_descriptor_writes_no_body() {
        let descriptor = ResponseDescriptor::redirect("/x");
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();

        assert_eq!(*exchange.body(), ResponseBody::Redirect("/x".to_string()));
    }

    #[tokio::test]
    async fn custom_handler_follow_up_is_resolved_in_place() {
        let descriptor = ResponseDescriptor::custom(|_| {
            Ok(Some(ResponseDescriptor::text("inner")))
        })
        .with_header("x-outer", "1");
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();

        assert_eq!(*exchange.body(), ResponseBody::Text("inner".to_string()));
        assert_eq!(exchange.headers()["x-outer"], "1");
    }

    #[tokio::test]
    async fn outer_and_inner_headers_both_land() {
        let descriptor = ResponseDescriptor::custom(|_| {
            Ok(Some(
                ResponseDescriptor::text("inner").with_header("x-inner", "2"),
            ))
        })
        .with_header("x-outer", "1");
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();

        assert_eq!(exchange.headers()["x-outer"], "1");
        assert_eq!(exchange.headers()["x-inner"], "2");
        assert_eq!(*exchange.body(), ResponseBody::Text("inner".to_string()));
    }

    #[tokio::test]
    async fn custom_handler_returning_nothing_keeps_outer_effects_only() {
        let descriptor = ResponseDescriptor::custom(|exchange| {
            exchange.set_header("x-direct", "yes");
            Ok(None)
        })
        .with_status(StatusCode::ACCEPTED);
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();

        assert_eq!(exchange.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(exchange.headers()["x-direct"], "yes");
        assert_eq!(*exchange.body(), ResponseBody::None);
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let descriptor = ResponseDescriptor::custom(|_| Err("boom".into()));
        let mut exchange = exchange();

        let error = resolve(&descriptor, &mut exchange, false).await.unwrap_err();
        assert!(matches!(error, ResolveError::Handler(_)));
    }

    #[tokio::test]
    async fn infinite_handler_chains_are_cut_off() {
        fn looping() -> ResponseDescriptor {
            ResponseDescriptor::custom(|_| Ok(Some(looping())))
        }
        let mut exchange = exchange();

        let error = resolve(&looping(), &mut exchange, false)
            .await
            .unwrap_err();
        assert!(matches!(error, ResolveError::ChainTooDeep));
    }

    #[tokio::test]
    async fn async_handler_outcome_is_resolved() {
        let descriptor = ResponseDescriptor::async_custom(|_, continuation| {
            tokio::spawn(async move {
                continuation.complete(Some(ResponseDescriptor::text("later")));
            });
        });
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();

        assert_eq!(*exchange.body(), ResponseBody::Text("later".to_string()));
    }

    #[tokio::test]
    async fn async_handler_declining_ends_resolution() {
        let descriptor = ResponseDescriptor::async_custom(|exchange, continuation| {
            exchange.set_status(StatusCode::NO_CONTENT);
            continuation.complete(None);
        });
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();

        assert_eq!(exchange.status(), Some(StatusCode::NO_CONTENT));
        assert_eq!(*exchange.body(), ResponseBody::None);
    }

    #[tokio::test]
    async fn dropped_continuation_ends_resolution_without_effects() {
        let descriptor = ResponseDescriptor::async_custom(|_, continuation| {
            drop(continuation);
        });
        let mut exchange = exchange();

        resolve(&descriptor, &mut exchange, false).await.unwrap();
        assert_eq!(*exchange.body(), ResponseBody::None);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_up_delays_are_discarded() {
        use std::time::Duration;

        let descriptor = ResponseDescriptor::custom(|_| {
            Ok(Some(
                ResponseDescriptor::text("fast")
                    .with_delay(Duration::from_secs(3600)),
            ))
        });
        let mut exchange = exchange();

        let start = tokio::time::Instant::now();
        resolve(&descriptor, &mut exchange, false).await.unwrap();

        // Under paused time an honored delay would show up as elapsed time.
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(*exchange.body(), ResponseBody::Text("fast".to_string()));
    }
}
