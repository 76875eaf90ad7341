//! # Manifest Model
//!
//! The manifest is the whole configuration surface of a server: which port
//! to listen on, which routes answer with which responses, where static
//! files live, and which peers are turned away. Declaring one and handing
//! it to [`App`](crate::server::App) is all it takes to run a server.
//!
//! Data-only manifests can also be loaded from JSON files through
//! [`loader`]; responses declared there are un-tagged literals classified
//! by [`classify`](crate::response::classify).

pub mod loader;
pub mod store;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use serde::Deserialize;

use crate::error::{ManifestError, Result};
use crate::exchange::RequestContext;
use crate::response::ResponseDescriptor;
use crate::route::Route;
use crate::views::{RawViews, ViewEngine};

/// Observer invoked with every request before resolution starts.
pub type RequestHandler = Arc<dyn Fn(&RequestContext) + Send + Sync>;

/// Hook that may reshape the router before the standard middleware stack
/// is applied.
pub type PreSetupHook = Arc<dyn Fn(Router) -> Router + Send + Sync>;

/// Default request body cap: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

const DEFAULT_BANNER: &str = "\
<h1>\
    Built with the <a href=\"https://github.com/manifest-rs/manifest-http\">manifest</a> engine\
</h1>";

/// Transport and process options.
#[derive(Clone)]
pub struct ServerOptions {
    pub port: u16,
    /// TLS toggle. Termination itself is expected from a fronting proxy;
    /// enabling this only makes the intent explicit and is logged.
    pub secure: bool,
    pub cors_enabled: bool,
    pub static_locations: Vec<StaticLocation>,
    pub body_limit: usize,
    pub pre_setup: Option<PreSetupHook>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: 3000,
            secure: false,
            cors_enabled: false,
            static_locations: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
            pre_setup: None,
        }
    }
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("cors_enabled", &self.cors_enabled)
            .field("static_locations", &self.static_locations)
            .field("body_limit", &self.body_limit)
            .field("pre_setup", &self.pre_setup.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

/// A directory of files served under an URL alias.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaticLocation {
    pub alias: String,
    pub real_path: PathBuf,
}

/// Routes plus cross-cutting request observers.
#[derive(Clone, Default)]
pub struct ApiOptions {
    pub routes: Vec<Route>,
    pub request_handlers: Vec<RequestHandler>,
}

impl std::fmt::Debug for ApiOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiOptions")
            .field("routes", &self.routes)
            .field("request_handlers", &self.request_handlers.len())
            .finish()
    }
}

/// View engine selection for page responses.
#[derive(Clone)]
pub struct ViewOptions {
    pub engine: Arc<dyn ViewEngine>,
}

impl ViewOptions {
    /// Serve template files verbatim from `root`.
    pub fn raw(root: impl Into<PathBuf>) -> Self {
        Self {
            engine: Arc::new(RawViews::new(root)),
        }
    }

    /// Use a caller-provided engine.
    pub fn custom(engine: Arc<dyn ViewEngine>) -> Self {
        Self { engine }
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::raw("views")
    }
}

impl std::fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewOptions").finish_non_exhaustive()
    }
}

/// Peers that are rejected outright.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Blacklist {
    pub ip: Vec<IpAddr>,
}

/// A complete server declaration.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub server: ServerOptions,
    pub api: ApiOptions,
    pub views: ViewOptions,
    pub blacklist: Option<Blacklist>,
}

impl Default for Manifest {
    /// A server on port 3000 answering every GET with a banner page.
    fn default() -> Self {
        Self {
            server: ServerOptions::default(),
            api: ApiOptions {
                routes: vec![Route::new(crate::route::CATCH_ALL)
                    .get(ResponseDescriptor::text(DEFAULT_BANNER))],
                request_handlers: Vec::new(),
            },
            views: ViewOptions::default(),
            blacklist: None,
        }
    }
}

impl Manifest {
    /// Validate the declaration before a router is built from it.
    ///
    /// Catches the shapes the router would otherwise reject at mount time
    /// with a far less helpful panic: URL patterns and static aliases must
    /// be absolute, and routes must declare at least one method.
    pub fn validate(&self) -> Result<()> {
        for route in &self.api.routes {
            if !route.is_catch_all() && !route.url.starts_with('/') {
                return Err(ManifestError::configuration(format!(
                    "route url '{}' must start with '/' (or be '*')",
                    route.url
                )));
            }
            if route.methods.is_empty() {
                return Err(ManifestError::configuration(format!(
                    "route '{}' declares no methods",
                    route.url
                )));
            }
        }

        let catch_alls = self
            .api
            .routes
            .iter()
            .filter(|route| route.is_catch_all())
            .count();
        if catch_alls > 1 {
            return Err(ManifestError::configuration(
                "only one catch-all route is allowed",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for route in &self.api.routes {
            if !seen.insert(route.url.as_str()) {
                return Err(ManifestError::configuration(format!(
                    "route url '{}' is declared more than once",
                    route.url
                )));
            }
        }

        for location in &self.server.static_locations {
            if !location.alias.starts_with('/') {
                return Err(ManifestError::configuration(format!(
                    "static alias '{}' must start with '/'",
                    location.alias
                )));
            }
        }

        Ok(())
    }
}
