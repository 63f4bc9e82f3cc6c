//! File extension → MIME type lookup for the static file dispatcher.

use std::collections::HashMap;
use std::path::Path;

/// Content type used when an extension is missing or not in the table.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Fixed extension table; keys are lower-case and carry no leading dot.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("htm", "text/html"),
    ("html", "text/html"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("css", "text/css"),
    ("webp", "image/webp"),
    ("png", "image/png"),
    ("jsonld", "application/ld+json"),
    ("mid", "audio/midi"),
    ("midi", "audio/x-midi"),
    ("mjs", "text/javascript"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("mpkg", "application/vnd.apple.installer+xml"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("oga", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("ogx", "application/ogg"),
    ("opus", "audio/opus"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("php", "application/x-httpd-php"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("rar", "application/vnd.rar"),
    ("rtf", "application/rtf"),
    ("sh", "application/x-sh"),
    ("svg", "image/svg+xml"),
    ("swf", "application/x-shockwave-flash"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ts", "video/mp2t"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("vsd", "application/vnd.visio"),
    ("wav", "audio/wav"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xhtml", "application/xhtml+xml"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("xml", "application/xml"),
    ("xul", "application/vnd.mozilla.xul+xml"),
    ("zip", "application/zip"),
    ("7z", "application/x-7z-compressed"),
    ("collection", "font/collection"),
    ("sfnt", "font/sfnt"),
    ("ico", "image/vnd.microsoft.icon"),
];

/// Immutable extension → MIME type registry.
///
/// The table is seeded once at construction and never changes, so a single
/// registry can be shared across every connection task behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ContentTypeRegistry {
    types: HashMap<&'static str, &'static str>,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self {
            types: CONTENT_TYPES.iter().copied().collect(),
        }
    }

    /// Looks up an extension such as `"css"`, `".css"` or `"CSS"`.
    ///
    /// Returns [`DEFAULT_CONTENT_TYPE`] for unknown extensions.
    pub fn lookup(&self, extension: &str) -> &'static str {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.types
            .get(ext.as_str())
            .copied()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Looks up the content type for a request path or file path.
    pub fn for_path(&self, path: &str) -> &'static str {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(DEFAULT_CONTENT_TYPE, |ext| self.lookup(ext))
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_maps_to_text_css() {
        let registry = ContentTypeRegistry::new();
        assert_eq!(registry.lookup("css"), "text/css");
    }

    #[test]
    fn test_lookup_ignores_leading_dot_and_case() {
        let registry = ContentTypeRegistry::new();
        assert_eq!(registry.lookup(".CSS"), "text/css");
        assert_eq!(registry.lookup(".Js"), "application/javascript");
    }

    #[test]
    fn test_unknown_extension_defaults_to_text_html() {
        let registry = ContentTypeRegistry::new();
        assert_eq!(registry.lookup("unknownext"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_for_path_uses_last_extension() {
        let registry = ContentTypeRegistry::new();
        assert_eq!(registry.for_path("/assets/app.min.js"), "application/javascript");
        assert_eq!(registry.for_path("/fonts/icons.woff2"), "font/woff2");
    }

    #[test]
    fn test_for_path_without_extension_defaults_to_text_html() {
        let registry = ContentTypeRegistry::new();
        assert_eq!(registry.for_path("/README"), "text/html");
    }

    #[test]
    fn test_registry_has_every_table_entry() {
        // No duplicate keys in the seed table.
        let registry = ContentTypeRegistry::new();
        assert_eq!(registry.len(), CONTENT_TYPES.len());
        assert!(!registry.is_empty());
    }
}
