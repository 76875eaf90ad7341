//! Process-wide default manifest.
//!
//! An embedding application can install its own default once at startup
//! and let the rest of its code call [`crate::server::App::with_defaults`]
//! without threading the manifest through.

use std::sync::OnceLock;

use parking_lot::RwLock;

use super::Manifest;

static STORE: OnceLock<RwLock<Manifest>> = OnceLock::new();

fn store() -> &'static RwLock<Manifest> {
    STORE.get_or_init(|| RwLock::new(Manifest::default()))
}

/// The current process-wide default manifest.
pub fn default_manifest() -> Manifest {
    store().read().clone()
}

/// Replace the process-wide default manifest.
pub fn set_default_manifest(manifest: Manifest) {
    *store().write() = manifest;
}
