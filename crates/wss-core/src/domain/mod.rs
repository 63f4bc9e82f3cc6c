//! Domain layer: pure business rules with no I/O.
//!
//! # Sub-modules
//!
//! - **`certificate`** – The request a caller makes when asking for a
//!   self-signed certificate: subject distinguished name, Subject Alternative
//!   Names, extended key-usage purposes, and validity.  All validation happens
//!   here so the certificate authority only ever sees well-formed input.
//!
//! - **`content_type`** – The fixed extension → MIME type table consulted by
//!   the static file dispatcher.

pub mod certificate;
pub mod content_type;
