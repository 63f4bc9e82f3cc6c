//! HTTP/1.1 request-head parsing and response encoding.
//!
//! # Why not a full HTTP server? (for beginners)
//!
//! The listener serves exactly two kinds of traffic on one port: GET requests
//! for static files, and WebSocket upgrades to `/echo`.  Both start the same
//! way, with an HTTP request head terminated by an empty line:
//!
//! ```text
//! GET /echo HTTP/1.1\r\n
//! Host: 192.168.68.201:42080\r\n
//! Upgrade: websocket\r\n
//! Connection: Upgrade\r\n
//! Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n
//! Sec-WebSocket-Version: 13\r\n
//! \r\n
//! ```
//!
//! Parsing that head is all the listener needs to route the connection.  The
//! heavy lifting (header tokenizing, limits) is done by `httparse`; this module
//! wraps it in owned, typed values and adds the handful of response shapes the
//! listener sends back.  Every response closes the connection afterwards, so
//! there is no keep-alive or pipelining state to manage.

use std::fmt;

use thiserror::Error;

/// Largest request head accepted before the connection is rejected.
pub const MAX_HEAD_LEN: usize = 8 * 1024;

/// Maximum number of request headers parsed.
pub const MAX_HEADERS: usize = 64;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors produced while parsing a request head.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The bytes are not a valid HTTP/1.x request head.
    #[error("malformed request head: {0}")]
    Malformed(String),

    /// The head grew past [`MAX_HEAD_LEN`] without terminating.
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
}

impl From<httparse::Error> for HttpError {
    fn from(e: httparse::Error) -> Self {
        HttpError::Malformed(e.to_string())
    }
}

// ── Request head ──────────────────────────────────────────────────────────────

/// An owned, parsed HTTP request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method, e.g. `GET`.
    pub method: String,
    /// Raw request target exactly as sent, including any query string.
    pub target: String,
    /// Headers in the order received; names keep their original case.
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// The request target without its query string or fragment.
    pub fn path(&self) -> &str {
        let end = self.target.find(['?', '#']).unwrap_or(self.target.len());
        &self.target[..end]
    }

    /// Returns the first header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this request asks to switch to the WebSocket protocol.
    ///
    /// Requires `Upgrade: websocket` and a `Connection` header that lists the
    /// `upgrade` token (browsers often send `keep-alive, Upgrade`).
    pub fn is_websocket_upgrade(&self) -> bool {
        let upgrade = self
            .header("upgrade")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));
        let connection = self.header("connection").is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });
        upgrade && connection
    }

    /// The client's `Sec-WebSocket-Key`, if present.
    pub fn websocket_key(&self) -> Option<&str> {
        self.header("sec-websocket-key").map(str::trim)
    }
}

/// Parses a request head from the start of `buf`.
///
/// Returns:
///
/// - `Ok(Some((head, len)))` when a complete head was found; `len` is the
///   number of bytes it occupied, so `buf[len..]` is whatever the client sent
///   after it.
/// - `Ok(None)` when more bytes are needed.
///
/// # Errors
///
/// Returns [`HttpError::Malformed`] for invalid syntax and
/// [`HttpError::HeadTooLarge`] when an incomplete head already exceeds
/// [`MAX_HEAD_LEN`].
pub fn parse_request_head(buf: &[u8]) -> Result<Option<(RequestHead, usize)>, HttpError> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut header_storage);

    let head_len = match request.parse(buf)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => {
            if buf.len() >= MAX_HEAD_LEN {
                return Err(HttpError::HeadTooLarge {
                    limit: MAX_HEAD_LEN,
                });
            }
            return Ok(None);
        }
    };

    let method = request
        .method
        .ok_or_else(|| HttpError::Malformed("missing method".to_string()))?
        .to_string();
    let target = request
        .path
        .ok_or_else(|| HttpError::Malformed("missing request target".to_string()))?
        .to_string();

    let headers = request
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).trim().to_string(),
            )
        })
        .collect();

    Ok(Some((
        RequestHead {
            method,
            target,
            headers,
        },
        head_len,
    )))
}

// ── Response ──────────────────────────────────────────────────────────────────

/// The status codes the listener sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    SwitchingProtocols,
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::SwitchingProtocols => 101,
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::SwitchingProtocols => "Switching Protocols",
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

/// A complete HTTP response ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// `200 OK` with the given content type and body.
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self::with_content_type(StatusCode::Ok, content_type, body)
    }

    /// `404 Not Found` with a plain-text body naming the unresolved path.
    pub fn not_found(path: &str) -> Self {
        Self::text(StatusCode::NotFound, format!("Path not found {path}"))
    }

    /// `400 Bad Request` with a plain-text reason.
    pub fn bad_request(reason: &str) -> Self {
        Self::text(StatusCode::BadRequest, format!("Bad request: {reason}"))
    }

    /// `405 Method Not Allowed`; only GET is served.
    pub fn method_not_allowed(method: &str) -> Self {
        let mut response = Self::text(
            StatusCode::MethodNotAllowed,
            format!("Method {method} not allowed"),
        );
        response.headers.push(("Allow".to_string(), "GET".to_string()));
        response
    }

    /// `500 Internal Server Error` with a plain-text reason.
    pub fn internal_error(reason: &str) -> Self {
        Self::text(StatusCode::InternalServerError, reason.to_string())
    }

    /// `101 Switching Protocols` completing a WebSocket handshake.
    ///
    /// `accept_key` is the `Sec-WebSocket-Accept` value derived from the
    /// client's key.
    pub fn switching_protocols(accept_key: &str) -> Self {
        Self {
            status: StatusCode::SwitchingProtocols,
            headers: vec![
                ("Upgrade".to_string(), "websocket".to_string()),
                ("Connection".to_string(), "Upgrade".to_string()),
                ("Sec-WebSocket-Accept".to_string(), accept_key.to_string()),
            ],
            body: Vec::new(),
        }
    }

    fn text(status: StatusCode, body: String) -> Self {
        Self::with_content_type(status, "text/plain; charset=utf-8", body.into_bytes())
    }

    fn with_content_type(status: StatusCode, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    /// Returns the first header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the status line, headers, and body.
    ///
    /// Every response except `101` gets `Content-Length` set to the body's
    /// byte length and `Connection: close`; a `101` hands the connection over
    /// to the WebSocket protocol, so it carries neither.
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        if self.status != StatusCode::SwitchingProtocols {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
            head.push_str("Connection: close\r\n");
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
