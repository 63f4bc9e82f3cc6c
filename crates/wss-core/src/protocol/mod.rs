//! Wire formats.
//!
//! - **`http`** – HTTP/1.1 request-head parsing and response encoding.  The
//!   listener reads just enough of each connection to decide whether it is a
//!   plain GET or a WebSocket upgrade; this module turns those bytes into a
//!   typed [`http::RequestHead`] and turns a typed [`http::Response`] back
//!   into bytes.

pub mod http;
