//! # wss-core
//!
//! Shared library for SecureWss containing the certificate request model,
//! the content-type registry, and the HTTP/1.1 framing used by the listener.
//!
//! This crate has zero dependencies on sockets, files, TLS libraries, or the
//! async runtime.  Everything here is a pure function of its inputs, which is
//! what makes it cheap to test exhaustively.
//!
//! # Architecture overview (for beginners)
//!
//! SecureWss turns a small device into a network endpoint: it serves static
//! files over HTTP(S) and echoes WebSocket messages back to their sender,
//! optionally over TLS with a self-signed certificate it generates itself.
//!
//! This crate (`wss-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Business rules with no I/O.  The certificate request
//!   model decides which subject names, Subject Alternative Names, and key
//!   purposes are acceptable *before* any cryptography runs.  The content-type
//!   registry maps file extensions to MIME types.
//!
//! - **`protocol`** – How bytes travel over the wire.  Incoming HTTP request
//!   heads are parsed into a typed [`RequestHead`] and outgoing responses are
//!   encoded from a typed [`Response`].

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `wss_core::CertificateRequest` instead of the full module path.
pub use domain::certificate::{
    CertificateRequest, DnAttribute, KeyPurpose, RequestError, SubjectAltName, SubjectName,
    DEFAULT_VALIDITY_DAYS, RSA_KEY_BITS,
};
pub use domain::content_type::{ContentTypeRegistry, DEFAULT_CONTENT_TYPE};
pub use protocol::http::{parse_request_head, HttpError, RequestHead, Response, StatusCode};
