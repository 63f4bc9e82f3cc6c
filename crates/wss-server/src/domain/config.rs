//! Configuration schema.
//!
//! [`AppConfig`] is the single source of truth for runtime settings.  It is
//! deserialized from a TOML file by the infrastructure layer and then
//! overridden field-by-field from CLI arguments in `main.rs`.
//!
//! # Example file
//!
//! ```toml
//! [server]
//! port = 42080
//! bind_address = "0.0.0.0"
//! root_path = "html"
//! tls_versions = ["1.2", "1.3"]
//!
//! [certificate]
//! directory = "user"
//! file_base_name = "selfCert"
//! password = "change-me"
//! subject = "CN=SecureWss"
//! subject_alt_names = ["localhost", "127.0.0.1"]
//! key_purposes = ["server-auth", "client-auth"]
//! validity_days = 3650
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` and every section is
//! `#[serde(default)]`, so an empty file, a file with only `[server]`, or no
//! file at all produce the same defaults as [`AppConfig::default`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use wss_core::{CertificateRequest, KeyPurpose, RequestError, DEFAULT_VALIDITY_DAYS};

/// File extension of the certificate archive written by the authority.
pub const ARCHIVE_EXTENSION: &str = "pfx";

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub certificate: CertificateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// TCP port serving both HTTP and WebSocket traffic.
    #[serde(default = "default_port")]
    pub port: u16,
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Directory static files are served from.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// TLS protocol versions offered in secure mode.
    #[serde(default = "default_tls_versions")]
    pub tls_versions: Vec<TlsVersion>,
}

/// A TLS protocol version that can be enabled in secure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TlsVersion::Tls12 => "TLS 1.2",
            TlsVersion::Tls13 => "TLS 1.3",
        })
    }
}

/// Certificate generation and archive settings.
///
/// `Debug` output redacts the archive password.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateConfig {
    /// Directory the archive is written to and loaded from.
    #[serde(default = "default_cert_directory")]
    pub directory: PathBuf,
    /// Archive file name without extension.
    #[serde(default = "default_file_base_name")]
    pub file_base_name: String,
    /// Password protecting the archive's private key.
    #[serde(default = "default_password")]
    pub password: String,
    /// Subject distinguished name, e.g. `"CN=SecureWss, O=Example"`.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// DNS names and IP literals the certificate is valid for.
    #[serde(default = "default_subject_alt_names")]
    pub subject_alt_names: Vec<String>,
    /// Extended key-usage purposes, in kebab case.
    #[serde(default = "default_key_purposes")]
    pub key_purposes: Vec<KeyPurpose>,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
}

impl CertificateConfig {
    /// `<directory>/<file_base_name>.pfx`
    pub fn archive_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{ARCHIVE_EXTENSION}", self.file_base_name))
    }

    /// Builds a validated certificate request from these settings.
    ///
    /// # Errors
    ///
    /// Any [`RequestError`] the subject, SAN list, purposes, or validity
    /// trigger.
    pub fn to_request(&self) -> Result<CertificateRequest, RequestError> {
        CertificateRequest::new(&self.subject, &self.subject_alt_names, &self.key_purposes)?
            .with_validity_days(self.validity_days)
    }
}

impl fmt::Debug for CertificateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateConfig")
            .field("directory", &self.directory)
            .field("file_base_name", &self.file_base_name)
            .field("password", &"<redacted>")
            .field("subject", &self.subject)
            .field("subject_alt_names", &self.subject_alt_names)
            .field("key_purposes", &self.key_purposes)
            .field("validity_days", &self.validity_days)
            .finish()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    42080
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_root_path() -> PathBuf {
    PathBuf::from("html")
}
fn default_tls_versions() -> Vec<TlsVersion> {
    vec![TlsVersion::Tls12, TlsVersion::Tls13]
}
fn default_cert_directory() -> PathBuf {
    PathBuf::from("user")
}
fn default_file_base_name() -> String {
    "selfCert".to_string()
}
fn default_password() -> String {
    "change-me".to_string()
}
fn default_subject() -> String {
    "CN=SecureWss".to_string()
}
fn default_subject_alt_names() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}
fn default_key_purposes() -> Vec<KeyPurpose> {
    vec![KeyPurpose::ServerAuth, KeyPurpose::ClientAuth]
}
fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            root_path: default_root_path(),
            tls_versions: default_tls_versions(),
        }
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            directory: default_cert_directory(),
            file_base_name: default_file_base_name(),
            password: default_password(),
            subject: default_subject(),
            subject_alt_names: default_subject_alt_names(),
            key_purposes: default_key_purposes(),
            validity_days: default_validity_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
