//! Self-signed certificate issuance, archive export, and inspection.
//!
//! # What this module does (for beginners)
//!
//! A TLS server needs two things: a certificate (public, sent to every
//! client) and the matching private key (secret, never leaves the device).
//! Without a real certificate authority, the device signs its own
//! certificate with its own key, a *self-signed* certificate.  Browsers
//! warn about it, but the connection is still encrypted.
//!
//! The flow is:
//!
//! ```text
//! CertificateRequest ──create──▶ IssuedCertificate ──write──▶ selfCert.pfx
//!                                                                 │
//!                       ArchivedCertificate ◀──read (password)────┘
//! ```
//!
//! The archive is PKCS#12 (`.pfx`): one file bundling the certificate and
//! its private key, with the key encrypted under a password.  The same
//! password must be given when the listener loads it for TLS.
//!
//! # Key material handling
//!
//! Key bytes this crate owns live in [`Zeroizing`] buffers.  An
//! [`IssuedCertificate`] is consumed by [`CertificateAuthority::write_certificate`],
//! so once the archive is on disk that copy is wiped.  Archives read back with
//! [`read_certificate`] hand out the key the same way.
//!
//! One copy is outside our control: `rcgen::KeyPair` keeps its own PKCS#8
//! encoding in a plain `Vec` and frees it without wiping when [`CertificateAuthority::issue`]
//! returns.

use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType, SerialNumber,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;
use zeroize::Zeroizing;

use wss_core::{CertificateRequest, DnAttribute, KeyPurpose, RequestError, SubjectAltName};

use crate::domain::ARCHIVE_EXTENSION;

/// Friendly name stored alongside the key inside the archive.
const ARCHIVE_FRIENDLY_NAME: &str = "SecureWss";

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors from certificate generation, export, and archive reading.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The subject, SAN list, purposes, or validity were rejected.
    #[error("invalid certificate request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// Key generation or signing failed.
    #[error("certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),

    /// The archive could not be assembled from the certificate and key.
    #[error("failed to build PKCS#12 archive")]
    ArchiveEncoding,

    /// A file system I/O error occurred.
    #[error("I/O error accessing certificate at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a PKCS#12 archive or its contents are corrupt.
    #[error("invalid certificate archive {path}: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    /// The archive's integrity check failed with the given password.
    #[error("wrong password for certificate archive {path}")]
    WrongPassword { path: PathBuf },

    /// The archive holds no certificate.
    #[error("certificate archive {path} contains no certificate")]
    MissingCertificate { path: PathBuf },

    /// The archive holds no private key.
    #[error("certificate archive {path} contains no private key")]
    MissingPrivateKey { path: PathBuf },

    /// The certificate could not be decoded as X.509.
    #[error("failed to decode certificate: {0}")]
    Decode(String),
}

// ── Issued and archived certificates ──────────────────────────────────────────

/// A freshly generated certificate and the private key that signed it.
///
/// The key is owned exclusively by this value until it is written out.
pub struct IssuedCertificate {
    cert_der: Vec<u8>,
    key_der: Zeroizing<Vec<u8>>,
    subject: String,
}

impl IssuedCertificate {
    /// DER encoding of the signed certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.cert_der
    }
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("subject", &self.subject)
            .field("cert_der_len", &self.cert_der.len())
            .finish_non_exhaustive()
    }
}

/// The contents of a certificate archive opened with its password.
pub struct ArchivedCertificate {
    /// DER encoding of the certificate.
    pub certificate_der: Vec<u8>,
    /// PKCS#8 DER encoding of the private key.
    pub private_key_der: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for ArchivedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchivedCertificate")
            .field("certificate_der_len", &self.certificate_der.len())
            .finish_non_exhaustive()
    }
}

/// Human-readable facts about an archived certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    /// Serial number as colon-separated hex.
    pub serial: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// SAN entries in certificate order, rendered as strings.
    pub subject_alt_names: Vec<String>,
    pub key_purposes: Vec<KeyPurpose>,
}

impl CertificateSummary {
    /// Issuer equals subject.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }
}

impl fmt::Display for CertificateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let purposes: Vec<&str> = self.key_purposes.iter().map(|p| p.as_str()).collect();
        writeln!(f, "subject:      {}", self.subject)?;
        writeln!(f, "issuer:       {}", self.issuer)?;
        writeln!(f, "serial:       {}", self.serial)?;
        writeln!(f, "not before:   {}", self.not_before)?;
        writeln!(f, "not after:    {}", self.not_after)?;
        writeln!(f, "alt names:    {}", self.subject_alt_names.join(", "))?;
        write!(f, "key purposes: {}", purposes.join(", "))
    }
}

// ── Certificate authority ─────────────────────────────────────────────────────

/// Issues self-signed certificates and exports them under a fixed password.
///
/// The password is process-wide configuration; the listener must be given
/// the same password to load the archive.
pub struct CertificateAuthority {
    password: Zeroizing<String>,
}

impl CertificateAuthority {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }

    /// Validates the inputs and issues a certificate with the default
    /// validity period.
    ///
    /// # Errors
    ///
    /// [`CertificateError::InvalidRequest`] for an empty or malformed SAN
    /// list, an empty purpose set, or a malformed subject;
    /// [`CertificateError::Generation`] if key generation or signing fails.
    pub fn create_self_signed_certificate<S: AsRef<str>>(
        &self,
        subject_dn: &str,
        san_list: &[S],
        key_purposes: &[KeyPurpose],
    ) -> Result<IssuedCertificate, CertificateError> {
        let request = CertificateRequest::new(subject_dn, san_list, key_purposes)?;
        self.issue(&request)
    }

    /// Generates a fresh RSA-2048 key pair and a certificate self-signed by
    /// it, described by an already validated request.
    ///
    /// # Errors
    ///
    /// [`CertificateError::Generation`] if key generation or signing fails.
    pub fn issue(&self, request: &CertificateRequest) -> Result<IssuedCertificate, CertificateError> {
        info!(
            subject = %request.subject(),
            bits = request.key_bits(),
            "generating RSA key pair"
        );
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_RSA_SHA256)?;

        let params = build_params(request)?;
        let certificate = params.self_signed(&key_pair)?;
        debug!(
            alt_names = request.alt_names().len(),
            purposes = request.purposes().len(),
            days = request.validity_days(),
            "certificate signed"
        );

        Ok(IssuedCertificate {
            cert_der: certificate.der().to_vec(),
            key_der: Zeroizing::new(key_pair.serialize_der()),
            subject: request.subject().to_string(),
        })
    }

    /// Exports `cert` and its key as `<directory>/<file_base_name>.pfx`,
    /// encrypted with the authority's password.  An existing file is
    /// overwritten.
    ///
    /// Consumes `cert`; the private key buffer is wiped when this returns.
    ///
    /// # Errors
    ///
    /// [`CertificateError::Io`] if the directory is missing or not writable,
    /// [`CertificateError::ArchiveEncoding`] if the archive cannot be built.
    pub fn write_certificate(
        &self,
        cert: IssuedCertificate,
        directory: &Path,
        file_base_name: &str,
    ) -> Result<PathBuf, CertificateError> {
        let path = directory.join(format!("{file_base_name}.{ARCHIVE_EXTENSION}"));

        let metadata = fs::metadata(directory).map_err(|source| CertificateError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(CertificateError::Io {
                path: directory.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let pfx = p12::PFX::new(
            &cert.cert_der,
            &cert.key_der,
            None,
            &self.password,
            ARCHIVE_FRIENDLY_NAME,
        )
        .ok_or(CertificateError::ArchiveEncoding)?;

        fs::write(&path, pfx.to_der()).map_err(|source| CertificateError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), subject = %cert.subject, "certificate archive written");
        Ok(path)
    }
}

impl fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateAuthority").finish_non_exhaustive()
    }
}

// ── Archive reading ───────────────────────────────────────────────────────────

/// Opens a certificate archive and returns its certificate and key.
///
/// The archive's MAC is checked first, so a wrong password is reported as
/// [`CertificateError::WrongPassword`] rather than as garbage key material.
///
/// # Errors
///
/// [`CertificateError::Io`] if the file cannot be read,
/// [`CertificateError::InvalidArchive`] if it is not PKCS#12,
/// [`CertificateError::WrongPassword`], or
/// [`CertificateError::MissingCertificate`] / [`CertificateError::MissingPrivateKey`].
pub fn read_certificate(path: &Path, password: &str) -> Result<ArchivedCertificate, CertificateError> {
    let bytes = fs::read(path).map_err(|source| CertificateError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |reason: String| CertificateError::InvalidArchive {
        path: path.to_path_buf(),
        reason,
    };

    let pfx = p12::PFX::parse(&bytes).map_err(|e| invalid(format!("{e:?}")))?;
    if !pfx.verify_mac(password) {
        return Err(CertificateError::WrongPassword {
            path: path.to_path_buf(),
        });
    }

    let certificate_der = pfx
        .cert_x509_bags(password)
        .map_err(|e| invalid(format!("{e:?}")))?
        .into_iter()
        .next()
        .ok_or_else(|| CertificateError::MissingCertificate {
            path: path.to_path_buf(),
        })?;

    let private_key_der = pfx
        .key_bags(password)
        .map_err(|e| invalid(format!("{e:?}")))?
        .into_iter()
        .next()
        .map(Zeroizing::new)
        .ok_or_else(|| CertificateError::MissingPrivateKey {
            path: path.to_path_buf(),
        })?;

    debug!(path = %path.display(), "certificate archive opened");
    Ok(ArchivedCertificate {
        certificate_der,
        private_key_der,
    })
}

/// Opens an archive and summarizes the certificate inside it.
///
/// # Errors
///
/// Everything [`read_certificate`] returns, plus [`CertificateError::Decode`]
/// if the certificate is not valid X.509.
pub fn inspect_certificate(path: &Path, password: &str) -> Result<CertificateSummary, CertificateError> {
    let archived = read_certificate(path, password)?;
    summarize(&archived.certificate_der)
}

/// Summarizes a DER-encoded X.509 certificate.
///
/// # Errors
///
/// [`CertificateError::Decode`] if the bytes are not a valid certificate.
pub fn summarize(certificate_der: &[u8]) -> Result<CertificateSummary, CertificateError> {
    let (_, cert) = X509Certificate::from_der(certificate_der)
        .map_err(|e| CertificateError::Decode(e.to_string()))?;

    let mut subject_alt_names = Vec::new();
    if let Some(ext) = cert
        .subject_alternative_name()
        .map_err(|e| CertificateError::Decode(e.to_string()))?
    {
        for name in &ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => subject_alt_names.push((*dns).to_string()),
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = ip_from_bytes(bytes) {
                        subject_alt_names.push(ip.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    let mut key_purposes = Vec::new();
    if let Some(ext) = cert
        .extended_key_usage()
        .map_err(|e| CertificateError::Decode(e.to_string()))?
    {
        let eku = ext.value;
        let flags = [
            (eku.server_auth, KeyPurpose::ServerAuth),
            (eku.client_auth, KeyPurpose::ClientAuth),
            (eku.code_signing, KeyPurpose::CodeSigning),
            (eku.email_protection, KeyPurpose::EmailProtection),
            (eku.time_stamping, KeyPurpose::TimeStamping),
            (eku.ocsp_signing, KeyPurpose::OcspSigning),
        ];
        key_purposes.extend(flags.into_iter().filter(|(set, _)| *set).map(|(_, p)| p));
    }

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: cert.raw_serial_as_string(),
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
        subject_alt_names,
        key_purposes,
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn build_params(request: &CertificateRequest) -> Result<CertificateParams, CertificateError> {
    let mut params = CertificateParams::default();

    let mut distinguished_name = DistinguishedName::new();
    for (attr, value) in request.subject().attributes() {
        distinguished_name.push(dn_type(*attr), value.clone());
    }
    params.distinguished_name = distinguished_name;

    for san in request.alt_names() {
        let entry = match san {
            SubjectAltName::Dns(name) => SanType::DnsName(name.as_str().try_into()?),
            SubjectAltName::Ip(ip) => SanType::IpAddress(*ip),
        };
        params.subject_alt_names.push(entry);
    }

    params.extended_key_usages = request.purposes().iter().map(|p| eku_purpose(*p)).collect();
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.is_ca = IsCa::ExplicitNoCa;

    let now = OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(i64::from(request.validity_days()));
    params.serial_number = Some(random_serial());

    Ok(params)
}

/// 128 random bits with the top bit cleared so the DER integer stays positive.
fn random_serial() -> SerialNumber {
    let mut bytes = *Uuid::new_v4().as_bytes();
    bytes[0] &= 0x7f;
    SerialNumber::from_slice(&bytes)
}

fn dn_type(attr: DnAttribute) -> DnType {
    match attr {
        DnAttribute::CommonName => DnType::CommonName,
        DnAttribute::Organization => DnType::OrganizationName,
        DnAttribute::OrganizationalUnit => DnType::OrganizationalUnitName,
        DnAttribute::Country => DnType::CountryName,
        DnAttribute::Locality => DnType::LocalityName,
        DnAttribute::State => DnType::StateOrProvinceName,
    }
}

fn eku_purpose(purpose: KeyPurpose) -> ExtendedKeyUsagePurpose {
    match purpose {
        KeyPurpose::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
        KeyPurpose::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
        KeyPurpose::CodeSigning => ExtendedKeyUsagePurpose::CodeSigning,
        KeyPurpose::EmailProtection => ExtendedKeyUsagePurpose::EmailProtection,
        KeyPurpose::TimeStamping => ExtendedKeyUsagePurpose::TimeStamping,
        KeyPurpose::OcspSigning => ExtendedKeyUsagePurpose::OcspSigning,
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
