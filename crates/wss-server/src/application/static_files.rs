//! Static file dispatcher.
//!
//! Maps a GET request path onto a file under the configured web root and
//! builds the response: file bytes with a content type chosen by extension,
//! or a 404 naming the path.
//!
//! Paths are resolved by plain concatenation onto the root, so `..` segments
//! are not filtered.  The listener is meant for a trusted LAN, and this is a
//! known limitation rather than an oversight.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::{debug, warn};
use wss_core::{ContentTypeRegistry, Response};

/// Served for `GET /`.
pub const INDEX_DOCUMENT: &str = "/index.html";

/// Resolves request paths to files under a fixed root.
///
/// Holds no mutable state, so one dispatcher is shared by every connection
/// task behind an `Arc`.
#[derive(Debug, Clone)]
pub struct StaticFileDispatcher {
    root: PathBuf,
    content_types: ContentTypeRegistry,
}

impl StaticFileDispatcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            content_types: ContentTypeRegistry::new(),
        }
    }

    /// The file a request path maps to.
    ///
    /// `/` becomes [`INDEX_DOCUMENT`]; everything else is appended to the
    /// root as-is.
    pub fn resolve(&self, request_path: &str) -> PathBuf {
        let path = if request_path == "/" {
            INDEX_DOCUMENT
        } else {
            request_path
        };
        let mut joined = OsString::from(self.root.as_os_str());
        joined.push(path);
        PathBuf::from(joined)
    }

    /// Content type for a request path, by extension.
    pub fn content_type(&self, request_path: &str) -> &'static str {
        let path = if request_path == "/" {
            INDEX_DOCUMENT
        } else {
            request_path
        };
        self.content_types.for_path(path)
    }

    /// Builds the response for `GET <request_path>`.
    ///
    /// Anything that is not a regular file (missing, a directory) yields
    /// `404` with a body naming the path; a file that exists but cannot be
    /// read yields `500`.
    pub async fn dispatch(&self, request_path: &str) -> Response {
        let file = self.resolve(request_path);

        let is_file = tokio::fs::metadata(&file)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            debug!(path = request_path, file = %file.display(), "static file not found");
            return Response::not_found(request_path);
        }

        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                let content_type = self.content_type(request_path);
                debug!(
                    path = request_path,
                    bytes = bytes.len(),
                    content_type,
                    "serving static file"
                );
                Response::ok(content_type, bytes)
            }
            Err(e) => {
                warn!(file = %file.display(), "failed to read static file: {e}");
                Response::internal_error("failed to read file")
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wss_core::StatusCode;

    fn web_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("style.css"), b"h1{color:red}").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets").join("app.js"), b"let x;").unwrap();
        dir
    }

    #[test]
    fn test_root_resolves_to_index_document() {
        let dispatcher = StaticFileDispatcher::new("/srv/html");
        assert_eq!(dispatcher.resolve("/"), PathBuf::from("/srv/html/index.html"));
    }

    #[test]
    fn test_paths_are_concatenated_onto_root() {
        let dispatcher = StaticFileDispatcher::new("/srv/html");
        assert_eq!(
            dispatcher.resolve("/assets/app.js"),
            PathBuf::from("/srv/html/assets/app.js")
        );
    }

    #[tokio::test]
    async fn test_root_and_index_return_same_bytes() {
        // Arrange
        let dir = web_root();
        let dispatcher = StaticFileDispatcher::new(dir.path());

        // Act
        let root = dispatcher.dispatch("/").await;
        let index = dispatcher.dispatch("/index.html").await;

        // Assert
        assert_eq!(root.status, StatusCode::Ok);
        assert_eq!(root.body, index.body);
        assert_eq!(root.header("Content-Type"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_css_is_served_as_text_css() {
        let dir = web_root();
        let dispatcher = StaticFileDispatcher::new(dir.path());

        let response = dispatcher.dispatch("/style.css").await;

        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.header("Content-Type"), Some("text/css"));
        assert_eq!(response.body, b"h1{color:red}");
    }

    #[tokio::test]
    async fn test_nested_file_is_served() {
        let dir = web_root();
        let dispatcher = StaticFileDispatcher::new(dir.path());

        let response = dispatcher.dispatch("/assets/app.js").await;

        assert_eq!(response.header("Content-Type"), Some("application/javascript"));
    }

    #[tokio::test]
    async fn test_missing_file_is_404_naming_the_path() {
        let dir = web_root();
        let dispatcher = StaticFileDispatcher::new(dir.path());

        let response = dispatcher.dispatch("/nonexistent.file").await;

        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.body, b"Path not found /nonexistent.file");
    }

    #[tokio::test]
    async fn test_directory_is_404() {
        let dir = web_root();
        let dispatcher = StaticFileDispatcher::new(dir.path());

        let response = dispatcher.dispatch("/assets").await;

        assert_eq!(response.status, StatusCode::NotFound);
    }
}
