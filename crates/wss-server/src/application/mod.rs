//! Application layer for wss-server.
//!
//! The application layer knows *what* the server does; it leaves sockets and
//! TLS handshakes to the infrastructure layer.
//!
//! # Responsibilities
//!
//! - Issuing self-signed certificates and reading them back from archives
//! - Mapping GET paths onto files under the web root
//! - Echoing WebSocket frames for the lifetime of one connection
//! - Parsing and executing console commands
//!
//! # What does NOT belong here?
//!
//! - Binding sockets or running the accept loop (infrastructure)
//! - Loading rustls configurations (infrastructure)
//! - The configuration file format (domain + infrastructure)

pub mod certificate_authority;
pub mod console;
pub mod echo_session;
pub mod static_files;

pub use certificate_authority::{
    inspect_certificate, read_certificate, ArchivedCertificate, CertificateAuthority,
    CertificateError, CertificateSummary, IssuedCertificate,
};
pub use console::{Command, CommandError, Controller, Reply};
pub use echo_session::{EchoSession, SessionError, SessionSummary};
pub use static_files::StaticFileDispatcher;
