//! # Server Bootstrap
//!
//! Turns a [`Manifest`] into a running HTTP server: routes mount onto an
//! axum router, static locations become file services, CORS honors the
//! per-route opt-outs, and the standard middleware stack wraps the result.
//!
//! The router itself is available through [`App::router`] so tests and
//! embedding applications can drive it without binding a socket.

pub(crate) mod dispatch;
pub(crate) mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::error::{ManifestError, Result};
use crate::manifest::{store, Manifest};
use crate::response::ResponseDescriptor;
use crate::route::Route;
use dispatch::DispatchState;
use middleware::{apply_middleware_stack, create_cors_layer};

/// A server built from a manifest, ready to start.
pub struct App {
    manifest: Manifest,
    router: Router,
}

impl App {
    /// Build a server from the given manifest. Fails when the manifest
    /// does not validate.
    pub fn new(manifest: Manifest) -> Result<Self> {
        manifest.validate()?;
        let router = build_router(&manifest);
        Ok(Self { manifest, router })
    }

    /// Build a server from the process-wide default manifest.
    pub fn with_defaults() -> Result<Self> {
        Self::new(store::default_manifest())
    }

    /// The manifest this server was built from.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// A clone of the finished router, for tests or embedding into a
    /// larger application.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured port and serve until the process is stopped.
    pub async fn start(self) -> Result<()> {
        let port = self.manifest.server.port;
        if self.manifest.server.secure {
            warn!("secure flag is set: expecting TLS termination from a fronting proxy");
        }

        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "manifest server listening");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(ManifestError::Io)
    }
}

fn build_router(manifest: &Manifest) -> Router {
    let state = DispatchState {
        views: manifest.views.engine.clone(),
        request_handlers: Arc::from(manifest.api.request_handlers.clone()),
        blacklist: Arc::from(
            manifest
                .blacklist
                .as_ref()
                .map(|blacklist| blacklist.ip.clone())
                .unwrap_or_default(),
        ),
        body_limit: manifest.server.body_limit,
    };

    let mut router = match &manifest.server.pre_setup {
        Some(hook) => hook(Router::new()),
        None => Router::new(),
    };

    for route in &manifest.api.routes {
        let mut method_router = build_method_router(&state, route);
        if manifest.server.cors_enabled && !route.cors_blocked {
            method_router = method_router.layer(create_cors_layer());
        }

        router = if route.is_catch_all() {
            router.fallback_service(method_router)
        } else {
            router.route(&route.url, method_router)
        };
    }

    for location in &manifest.server.static_locations {
        router = router.nest_service(&location.alias, ServeDir::new(&location.real_path));
    }

    apply_middleware_stack(router)
}

fn build_method_router(state: &DispatchState, route: &Route) -> MethodRouter {
    let mut method_router = MethodRouter::new();
    for (method, descriptor) in route.methods.entries() {
        let filter = if method == axum::http::Method::GET {
            MethodFilter::GET
        } else if method == axum::http::Method::POST {
            MethodFilter::POST
        } else if method == axum::http::Method::PUT {
            MethodFilter::PUT
        } else {
            MethodFilter::DELETE
        };
        method_router = method_router.on(filter, handler_for(state.clone(), descriptor.clone()));
    }
    method_router
}

/// Boxed dispatch future, so route handler closures have a nameable type.
type DispatchFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = axum::response::Response> + Send>>;

fn handler_for(
    state: DispatchState,
    descriptor: Arc<ResponseDescriptor>,
) -> impl Fn(Option<ConnectInfo<SocketAddr>>, Request) -> DispatchFuture + Clone + Send + 'static {
    move |connect_info, request| {
        let state = state.clone();
        let descriptor = descriptor.clone();
        Box::pin(async move {
            dispatch::dispatch(
                state,
                descriptor,
                connect_info.map(|ConnectInfo(peer)| peer),
                request,
            )
            .await
        })
    }
}
