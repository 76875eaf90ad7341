//! Route declarations: a URL pattern plus up to one response per method.

use std::sync::Arc;

use axum::http::Method;

use crate::response::ResponseDescriptor;

/// Pattern that mounts as the router's catch-all fallback.
pub const CATCH_ALL: &str = "*";

/// Per-method response slots for one route.
#[derive(Debug, Clone, Default)]
pub struct MethodResponses {
    pub get: Option<Arc<ResponseDescriptor>>,
    pub post: Option<Arc<ResponseDescriptor>>,
    pub put: Option<Arc<ResponseDescriptor>>,
    pub delete: Option<Arc<ResponseDescriptor>>,
}

impl MethodResponses {
    pub fn is_empty(&self) -> bool {
        self.get.is_none() && self.post.is_none() && self.put.is_none() && self.delete.is_none()
    }

    /// Iterate the populated method slots.
    pub fn entries(&self) -> impl Iterator<Item = (Method, &Arc<ResponseDescriptor>)> + '_ {
        [
            (Method::GET, self.get.as_ref()),
            (Method::POST, self.post.as_ref()),
            (Method::PUT, self.put.as_ref()),
            (Method::DELETE, self.delete.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, descriptor)| descriptor.map(|descriptor| (method, descriptor)))
    }
}

/// One declared route. `url` uses the router's path syntax (`/users/:id`),
/// or [`CATCH_ALL`] to answer anything no other route matched.
#[derive(Debug, Clone)]
pub struct Route {
    pub url: String,
    pub cors_blocked: bool,
    pub methods: MethodResponses,
}

impl Route {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cors_blocked: false,
            methods: MethodResponses::default(),
        }
    }

    pub fn get(mut self, descriptor: ResponseDescriptor) -> Self {
        self.methods.get = Some(Arc::new(descriptor));
        self
    }

    pub fn post(mut self, descriptor: ResponseDescriptor) -> Self {
        self.methods.post = Some(Arc::new(descriptor));
        self
    }

    pub fn put(mut self, descriptor: ResponseDescriptor) -> Self {
        self.methods.put = Some(Arc::new(descriptor));
        self
    }

    pub fn delete(mut self, descriptor: ResponseDescriptor) -> Self {
        self.methods.delete = Some(Arc::new(descriptor));
        self
    }

    /// Opt this route out of the CORS layer even when the server enables it.
    pub fn block_cors(mut self) -> Self {
        self.cors_blocked = true;
        self
    }

    pub fn is_catch_all(&self) -> bool {
        self.url == CATCH_ALL
    }
}
