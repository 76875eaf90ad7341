//! View engine seam for page responses.
//!
//! Page descriptors carry a template path and an optional data context; how
//! that pair becomes markup is the embedding application's business. The
//! built-in [`RawViews`] engine serves template files verbatim and ignores
//! the context, which is enough for static pages and for tests. Anything
//! richer (Handlebars, Tera, ...) plugs in through [`ViewEngine`].

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Template context handed to a view engine alongside the template path.
pub type ViewData = serde_json::Value;

/// Errors produced while rendering a page response.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("template '{path}' could not be read: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template path '{0}' is outside the views directory")]
    OutsideRoot(String),

    #[error("template '{path}' failed to render: {reason}")]
    Render { path: String, reason: String },
}

/// Turns a template path plus optional context into a rendered body.
pub trait ViewEngine: Send + Sync {
    fn render(&self, path: &str, data: Option<&ViewData>) -> Result<String, ViewError>;
}

/// Pass-through engine: reads template files from a root directory without
/// any interpolation. Template paths must stay inside the root.
pub struct RawViews {
    root: PathBuf,
}

impl RawViews {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ViewEngine for RawViews {
    fn render(&self, path: &str, _data: Option<&ViewData>) -> Result<String, ViewError> {
        let relative = Path::new(path);
        let escapes_root = relative
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::RootDir));
        if escapes_root {
            return Err(ViewError::OutsideRoot(path.to_string()));
        }

        let full_path = self.root.join(relative);
        std::fs::read_to_string(&full_path).map_err(|source| ViewError::Io {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn raw_views_serves_file_contents_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("index.html")).unwrap();
        write!(file, "<h1>{{{{ not interpolated }}}}</h1>").unwrap();

        let views = RawViews::new(dir.path());
        let rendered = views.render("index.html", None).unwrap();
        assert_eq!(rendered, "<h1>{{ not interpolated }}</h1>");
    }

    #[test]
    fn raw_views_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let views = RawViews::new(dir.path());

        let error = views.render("../outside.html", None).unwrap_err();
        assert!(matches!(error, ViewError::OutsideRoot(_)));
    }

    #[test]
    fn raw_views_rejects_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let views = RawViews::new(dir.path());

        let error = views.render("/etc/hostname", None).unwrap_err();
        assert!(matches!(error, ViewError::OutsideRoot(_)));
    }

    #[test]
    fn raw_views_reports_missing_templates() {
        let dir = tempfile::tempdir().unwrap();
        let views = RawViews::new(dir.path());

        let error = views.render("missing.html", None).unwrap_err();
        assert!(matches!(error, ViewError::Io { .. }));
    }
}
