//! TLS configuration loaded from a certificate archive.
//!
//! [`load_tls_config`] opens the PKCS#12 archive written by the certificate
//! authority, checks its password, and builds a rustls [`ServerConfig`] that:
//!
//! - presents the archived certificate, signing with a key parsed straight
//!   from the archive's zeroizing buffer,
//! - offers only the configured protocol versions,
//! - advertises `http/1.1` via ALPN (the WebSocket upgrade rides on HTTP/1.1),
//! - asks clients for a certificate but accepts any answer, including none.
//!
//! # Why accept every client certificate?
//!
//! The device has no trust store to check client certificates against.
//! Requesting one keeps the handshake compatible with clients that expect
//! to present a certificate, and [`AcceptAnyClientCert`] makes the policy
//! explicit instead of hiding it behind a missing verifier.

use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::HandshakeSignatureValid;
use rustls::crypto::aws_lc_rs::sign::any_supported_type;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{
    DigitallySignedStruct, DistinguishedName, ServerConfig, SignatureScheme,
    SupportedProtocolVersion,
};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info};

use crate::application::certificate_authority::{read_certificate, CertificateError};
use crate::domain::TlsVersion;

/// ALPN protocol advertised to clients.
const ALPN_HTTP11: &[u8] = b"http/1.1";

/// Errors building a TLS configuration.
#[derive(Debug, Error)]
pub enum TlsConfigError {
    /// The archive could not be read, is corrupt, or the password is wrong.
    #[error("cannot load certificate archive: {0}")]
    Archive(#[from] CertificateError),

    /// rustls rejected the certificate, key, or protocol set.
    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),

    /// The protocol version list was empty.
    #[error("no TLS protocol versions enabled")]
    NoProtocolVersions,
}

/// A ready-to-use TLS server configuration.
#[derive(Clone)]
pub struct TlsConfig {
    server_config: Arc<ServerConfig>,
    versions: Vec<TlsVersion>,
}

impl TlsConfig {
    /// A handshake driver sharing this configuration.
    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(Arc::clone(&self.server_config))
    }

    pub fn versions(&self) -> &[TlsVersion] {
        &self.versions
    }

    pub fn server_config(&self) -> &Arc<ServerConfig> {
        &self.server_config
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("versions", &self.versions)
            .finish_non_exhaustive()
    }
}

/// Loads `archive` with `password` and builds a TLS server configuration.
///
/// Duplicate entries in `versions` are ignored.
///
/// # Errors
///
/// [`TlsConfigError::Archive`] for unreadable archives and wrong passwords,
/// [`TlsConfigError::NoProtocolVersions`] for an empty version list, and
/// [`TlsConfigError::Rustls`] if rustls refuses the key or certificate.
pub fn load_tls_config(
    archive: &Path,
    password: &str,
    versions: &[TlsVersion],
) -> Result<TlsConfig, TlsConfigError> {
    let mut enabled: Vec<TlsVersion> = Vec::with_capacity(versions.len());
    for version in versions {
        if !enabled.contains(version) {
            enabled.push(*version);
        }
    }
    if enabled.is_empty() {
        return Err(TlsConfigError::NoProtocolVersions);
    }

    let archived = read_certificate(archive, password)?;
    // The signer parses the key from the zeroizing buffer; no plain copy is made.
    let signing_key = any_supported_type(&PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        &archived.private_key_der[..],
    )))?;
    let certified = CertifiedKey::new(
        vec![CertificateDer::from(archived.certificate_der)],
        signing_key,
    );

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let protocol_versions: Vec<&'static SupportedProtocolVersion> =
        enabled.iter().map(|v| rustls_version(*v)).collect();

    let mut server_config = ServerConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(&protocol_versions)?
        .with_client_cert_verifier(Arc::new(AcceptAnyClientCert::new(provider)))
        .with_cert_resolver(Arc::new(ArchivedCertResolver::new(certified)));
    server_config.alpn_protocols = vec![ALPN_HTTP11.to_vec()];

    info!(
        archive = %archive.display(),
        versions = ?enabled,
        "TLS configuration loaded"
    );

    Ok(TlsConfig {
        server_config: Arc::new(server_config),
        versions: enabled,
    })
}

fn rustls_version(version: TlsVersion) -> &'static SupportedProtocolVersion {
    match version {
        TlsVersion::Tls12 => &rustls::version::TLS12,
        TlsVersion::Tls13 => &rustls::version::TLS13,
    }
}

// ── Server certificate ────────────────────────────────────────────────────────

/// Presents the archived certificate to every client, whatever SNI it sends.
#[derive(Debug)]
struct ArchivedCertResolver {
    key: Arc<CertifiedKey>,
}

impl ArchivedCertResolver {
    fn new(key: CertifiedKey) -> Self {
        Self { key: Arc::new(key) }
    }
}

impl ResolvesServerCert for ArchivedCertResolver {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.key))
    }
}

// ── Client certificate policy ─────────────────────────────────────────────────

/// Client certificate verifier that requests a certificate and accepts any
/// certificate, or none.
///
/// Handshake signatures are still checked, so a client that presents a
/// certificate must hold its private key.
#[derive(Debug)]
pub struct AcceptAnyClientCert {
    provider: Arc<CryptoProvider>,
}

impl AcceptAnyClientCert {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ClientCertVerifier for AcceptAnyClientCert {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        false
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        debug!(
            cert_len = end_entity.len(),
            intermediates = intermediates.len(),
            "client certificate accepted"
        );
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
