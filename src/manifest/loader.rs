//! JSON manifest loading.
//!
//! Covers the data-only subset of a manifest: server options, routes with
//! literal responses, static locations and the blacklist. Request
//! handlers, custom responses, pre-setup hooks and view engines are code
//! and stay in code.
//!
//! Response literals are un-tagged; each is classified into a variant by
//! the fixed predicate order in [`classify`](crate::response::classify)
//! and rejected loudly when it matches no shape. Loading validates the
//! result before returning, so a manifest that loads is a manifest that
//! mounts.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{ApiOptions, Blacklist, Manifest, ServerOptions, StaticLocation, ViewOptions};
use crate::error::{ManifestError, Result};
use crate::response::classify::descriptor_from_value;
use crate::route::{MethodResponses, Route};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    server: RawServer,
    api: RawApi,
    #[serde(default)]
    blacklist: Option<Blacklist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawServer {
    port: Option<u16>,
    secure: Option<bool>,
    cors_enabled: Option<bool>,
    #[serde(default)]
    static_locations: Vec<StaticLocation>,
    body_limit: Option<usize>,
    views_directory: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApi {
    routes: Vec<RawRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRoute {
    url: String,
    #[serde(default)]
    cors_blocked: bool,
    methods: RawMethods,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMethods {
    get: Option<Value>,
    post: Option<Value>,
    put: Option<Value>,
    delete: Option<Value>,
}

/// Load a manifest from a JSON string.
pub fn from_json_str(json: &str) -> Result<Manifest> {
    let raw: RawManifest = serde_json::from_str(json)?;
    build(raw)
}

/// Load a manifest from a JSON file.
pub fn from_path(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading manifest");
    let json = std::fs::read_to_string(path)?;
    let manifest = from_json_str(&json)?;
    info!(
        path = %path.display(),
        routes = manifest.api.routes.len(),
        port = manifest.server.port,
        "manifest loaded"
    );
    Ok(manifest)
}

fn build(raw: RawManifest) -> Result<Manifest> {
    let defaults = ServerOptions::default();
    let server = ServerOptions {
        port: raw.server.port.unwrap_or(defaults.port),
        secure: raw.server.secure.unwrap_or(defaults.secure),
        cors_enabled: raw.server.cors_enabled.unwrap_or(defaults.cors_enabled),
        static_locations: raw.server.static_locations,
        body_limit: raw.server.body_limit.unwrap_or(defaults.body_limit),
        pre_setup: None,
    };

    let views = match raw.server.views_directory {
        Some(directory) => ViewOptions::raw(directory),
        None => ViewOptions::default(),
    };

    let mut routes = Vec::with_capacity(raw.api.routes.len());
    for route in raw.api.routes {
        routes.push(build_route(route)?);
    }

    let manifest = Manifest {
        server,
        api: ApiOptions {
            routes,
            request_handlers: Vec::new(),
        },
        views,
        blacklist: raw.blacklist,
    };
    manifest.validate()?;
    Ok(manifest)
}

fn build_route(raw: RawRoute) -> Result<Route> {
    Ok(Route {
        cors_blocked: raw.cors_blocked,
        methods: MethodResponses {
            get: literal_for(&raw.url, raw.methods.get)?,
            post: literal_for(&raw.url, raw.methods.post)?,
            put: literal_for(&raw.url, raw.methods.put)?,
            delete: literal_for(&raw.url, raw.methods.delete)?,
        },
        url: raw.url,
    })
}

fn literal_for(
    url: &str,
    value: Option<Value>,
) -> Result<Option<std::sync::Arc<crate::response::ResponseDescriptor>>> {
    value
        .map(|value| {
            descriptor_from_value(&value)
                .map(std::sync::Arc::new)
                .map_err(|error| {
                    ManifestError::configuration(format!("route '{url}': {error}"))
                })
        })
        .transpose()
}
