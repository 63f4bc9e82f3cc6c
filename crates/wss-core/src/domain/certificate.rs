//! Certificate request model and strict validation.
//!
//! A [`CertificateRequest`] describes the self-signed certificate a caller
//! wants: who it is issued to (the subject distinguished name), which extra
//! identities it covers (Subject Alternative Names), and what it may be used
//! for (extended key-usage purposes).
//!
//! # Why validate here? (for beginners)
//!
//! Certificate libraries will happily encode almost any string you give them.
//! A certificate with a typo in its SAN list is still a valid certificate; it
//! just never matches the host a browser connects to, and the failure shows up
//! much later as an opaque TLS error.  Rejecting malformed input up front, with
//! an error that names the offending entry, is far cheaper to debug.
//!
//! # SAN classification rules
//!
//! Each SAN string is classified exactly once:
//!
//! 1. If it parses as an IP address (`192.168.1.10`, `::1`) it becomes an
//!    [`SubjectAltName::Ip`] entry.
//! 2. Otherwise it must be a valid DNS hostname: 1–253 characters, dot
//!    separated labels of 1–63 ASCII letters, digits, or `-`, with no label
//!    starting or ending in `-`.  Wildcards and trailing dots are rejected.
//! 3. A dotted string made only of digits that failed step 1
//!    (`192.168.1.300`) is rejected instead of being treated as a hostname.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the RSA modulus generated for every certificate.
pub const RSA_KEY_BITS: u32 = 2048;

/// Validity applied when the caller does not choose one (ten years).
pub const DEFAULT_VALIDITY_DAYS: u32 = 3650;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

// ── Error type ────────────────────────────────────────────────────────────────

/// Reasons a certificate request is rejected before any key is generated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The subject distinguished name could not be parsed.
    #[error("malformed subject '{subject}': {reason}")]
    MalformedSubject {
        subject: String,
        reason: &'static str,
    },

    /// The SAN list was empty.
    #[error("at least one subject alternative name is required")]
    NoSubjectAltNames,

    /// A SAN entry is neither an IP literal nor a valid DNS hostname.
    #[error("invalid subject alternative name '{entry}': {reason}")]
    InvalidSubjectAltName { entry: String, reason: &'static str },

    /// The same SAN appears twice.
    #[error("duplicate subject alternative name '{0}'")]
    DuplicateSubjectAltName(String),

    /// The key-purpose set was empty.
    #[error("at least one extended key usage purpose is required")]
    NoKeyPurposes,

    /// A key-purpose name was not recognised.
    #[error("unknown key purpose '{0}'")]
    UnknownKeyPurpose(String),

    /// The validity period was zero days.
    #[error("validity must be at least one day, got {0}")]
    InvalidValidity(u32),
}

// ── Subject distinguished name ────────────────────────────────────────────────

/// The attribute types accepted in a subject distinguished name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnAttribute {
    CommonName,
    Organization,
    OrganizationalUnit,
    Country,
    Locality,
    State,
}

impl DnAttribute {
    /// Short attribute key as written in a DN string (`CN`, `O`, ...).
    pub fn key(self) -> &'static str {
        match self {
            DnAttribute::CommonName => "CN",
            DnAttribute::Organization => "O",
            DnAttribute::OrganizationalUnit => "OU",
            DnAttribute::Country => "C",
            DnAttribute::Locality => "L",
            DnAttribute::State => "ST",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_uppercase().as_str() {
            "CN" => Some(DnAttribute::CommonName),
            "O" => Some(DnAttribute::Organization),
            "OU" => Some(DnAttribute::OrganizationalUnit),
            "C" => Some(DnAttribute::Country),
            "L" => Some(DnAttribute::Locality),
            "ST" => Some(DnAttribute::State),
            _ => None,
        }
    }
}

/// A parsed subject distinguished name such as `CN=SecureWss, O=Acme`.
///
/// Attributes keep the order they were written in, which is also the order
/// they are encoded into the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectName {
    attributes: Vec<(DnAttribute, String)>,
}

impl SubjectName {
    /// Parses a comma-separated `KEY=value` distinguished name.
    ///
    /// Escaped characters (`\,`) and quoted values are not supported; a DN
    /// containing `\` or `"` is rejected rather than guessed at.
    ///
    /// The result is normalized: keys are upper-cased and whitespace around
    /// `,` and `=` is dropped, so `"cn=a,O=b"` displays as `"CN=a, O=b"`.
    /// An issued certificate's subject equals this normalized form, not the
    /// input string.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MalformedSubject`] when the string is empty,
    /// an attribute is missing `=`, a key is unknown or repeated, a value is
    /// empty, or a country code is not two ASCII letters.
    pub fn parse(dn: &str) -> Result<Self, RequestError> {
        let malformed = |reason| RequestError::MalformedSubject {
            subject: dn.to_string(),
            reason,
        };

        if dn.trim().is_empty() {
            return Err(malformed("empty distinguished name"));
        }
        if dn.contains(['\\', '"']) {
            return Err(malformed("escaped or quoted values are not supported"));
        }

        let mut attributes = Vec::new();
        let mut seen = HashSet::new();

        for part in dn.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| malformed("attribute without '='"))?;
            let attr =
                DnAttribute::from_key(key.trim()).ok_or_else(|| malformed("unknown attribute"))?;
            let value = value.trim();

            if value.is_empty() {
                return Err(malformed("empty attribute value"));
            }
            if !seen.insert(attr) {
                return Err(malformed("repeated attribute"));
            }
            if attr == DnAttribute::Country
                && !(value.len() == 2 && value.chars().all(|c| c.is_ascii_alphabetic()))
            {
                return Err(malformed("country must be a two-letter code"));
            }

            attributes.push((attr, value.to_string()));
        }

        Ok(Self { attributes })
    }

    /// The parsed attributes in their original order.
    pub fn attributes(&self) -> &[(DnAttribute, String)] {
        &self.attributes
    }

    /// The `CN` value, if one was given.
    pub fn common_name(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| *attr == DnAttribute::CommonName)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for SubjectName {
    /// Formats as `CN=value, O=value`, the same rendering X.509 tooling uses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (attr, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", attr.key(), value)?;
        }
        Ok(())
    }
}

impl FromStr for SubjectName {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Subject Alternative Names ─────────────────────────────────────────────────

/// One Subject Alternative Name entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectAltName {
    /// A DNS hostname such as `device-01` or `panel.example.com`.
    Dns(String),
    /// An IPv4 or IPv6 address literal.
    Ip(IpAddr),
}

impl SubjectAltName {
    /// Classifies and validates a single SAN string.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidSubjectAltName`] naming the entry and
    /// the rule it broke.
    pub fn parse(entry: &str) -> Result<Self, RequestError> {
        if let Ok(ip) = entry.parse::<IpAddr>() {
            return Ok(SubjectAltName::Ip(ip));
        }
        validate_hostname(entry)?;
        Ok(SubjectAltName::Dns(entry.to_string()))
    }
}

impl fmt::Display for SubjectAltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectAltName::Dns(name) => f.write_str(name),
            SubjectAltName::Ip(ip) => write!(f, "{ip}"),
        }
    }
}

impl FromStr for SubjectAltName {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_hostname(entry: &str) -> Result<(), RequestError> {
    let invalid = |reason| RequestError::InvalidSubjectAltName {
        entry: entry.to_string(),
        reason,
    };

    if entry.is_empty() {
        return Err(invalid("empty entry"));
    }
    if entry.len() > MAX_HOSTNAME_LEN {
        return Err(invalid("hostname longer than 253 characters"));
    }

    let labels: Vec<&str> = entry.split('.').collect();
    for label in &labels {
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid("label longer than 63 characters"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("only letters, digits and '-' are allowed"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label starts or ends with '-'"));
        }
    }

    // A dotted all-digit string that failed IP parsing is a broken address,
    // not a hostname.
    if labels.len() > 1 && labels.iter().all(|l| l.chars().all(|c| c.is_ascii_digit())) {
        return Err(invalid("not a valid IP address"));
    }

    Ok(())
}

// ── Extended key usage ────────────────────────────────────────────────────────

/// Extended key-usage purposes that can be embedded in a certificate.
///
/// In configuration files these are written in kebab case
/// (`"server-auth"`, `"client-auth"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPurpose {
    /// TLS server authentication (`1.3.6.1.5.5.7.3.1`).
    ServerAuth,
    /// TLS client authentication (`1.3.6.1.5.5.7.3.2`).
    ClientAuth,
    /// Code signing (`1.3.6.1.5.5.7.3.3`).
    CodeSigning,
    /// E-mail protection (`1.3.6.1.5.5.7.3.4`).
    EmailProtection,
    /// Trusted time stamping (`1.3.6.1.5.5.7.3.8`).
    TimeStamping,
    /// OCSP response signing (`1.3.6.1.5.5.7.3.9`).
    OcspSigning,
}

impl KeyPurpose {
    /// Every purpose, in OID order.
    pub const ALL: [KeyPurpose; 6] = [
        KeyPurpose::ServerAuth,
        KeyPurpose::ClientAuth,
        KeyPurpose::CodeSigning,
        KeyPurpose::EmailProtection,
        KeyPurpose::TimeStamping,
        KeyPurpose::OcspSigning,
    ];

    /// The kebab-case name used in configuration and console output.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyPurpose::ServerAuth => "server-auth",
            KeyPurpose::ClientAuth => "client-auth",
            KeyPurpose::CodeSigning => "code-signing",
            KeyPurpose::EmailProtection => "email-protection",
            KeyPurpose::TimeStamping => "time-stamping",
            KeyPurpose::OcspSigning => "ocsp-signing",
        }
    }

    /// The dotted object identifier of this purpose.
    pub fn oid(self) -> &'static str {
        match self {
            KeyPurpose::ServerAuth => "1.3.6.1.5.5.7.3.1",
            KeyPurpose::ClientAuth => "1.3.6.1.5.5.7.3.2",
            KeyPurpose::CodeSigning => "1.3.6.1.5.5.7.3.3",
            KeyPurpose::EmailProtection => "1.3.6.1.5.5.7.3.4",
            KeyPurpose::TimeStamping => "1.3.6.1.5.5.7.3.8",
            KeyPurpose::OcspSigning => "1.3.6.1.5.5.7.3.9",
        }
    }
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyPurpose {
    type Err = RequestError;

    /// Accepts kebab-case or snake-case names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        KeyPurpose::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| RequestError::UnknownKeyPurpose(s.to_string()))
    }
}

// ── Certificate request ───────────────────────────────────────────────────────

/// A validated request for one self-signed certificate.
///
/// Built with [`CertificateRequest::new`], which enforces every rule in this
/// module.  The key size is fixed at [`RSA_KEY_BITS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    subject: SubjectName,
    alt_names: Vec<SubjectAltName>,
    purposes: Vec<KeyPurpose>,
    validity_days: u32,
}

impl CertificateRequest {
    /// Validates the inputs and builds a request with the default validity.
    ///
    /// Repeated key purposes are collapsed (first occurrence wins); repeated
    /// SAN entries are an error because they almost always indicate a
    /// configuration mistake.
    ///
    /// # Errors
    ///
    /// Any [`RequestError`] describing the first rule the input breaks.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wss_core::{CertificateRequest, KeyPurpose, SubjectAltName};
    ///
    /// let req = CertificateRequest::new(
    ///     "CN=SecureWss",
    ///     &["device-01", "192.168.68.201"],
    ///     &[KeyPurpose::ServerAuth, KeyPurpose::ClientAuth],
    /// )
    /// .unwrap();
    /// assert_eq!(req.alt_names().len(), 2);
    /// assert!(matches!(req.alt_names()[1], SubjectAltName::Ip(_)));
    /// ```
    pub fn new<S: AsRef<str>>(
        subject: &str,
        alt_names: &[S],
        purposes: &[KeyPurpose],
    ) -> Result<Self, RequestError> {
        let subject = SubjectName::parse(subject)?;

        if alt_names.is_empty() {
            return Err(RequestError::NoSubjectAltNames);
        }
        let mut seen = HashSet::new();
        let mut parsed = Vec::with_capacity(alt_names.len());
        for entry in alt_names {
            let san = SubjectAltName::parse(entry.as_ref())?;
            if !seen.insert(san.clone()) {
                return Err(RequestError::DuplicateSubjectAltName(san.to_string()));
            }
            parsed.push(san);
        }

        if purposes.is_empty() {
            return Err(RequestError::NoKeyPurposes);
        }
        let mut unique_purposes = Vec::with_capacity(purposes.len());
        for purpose in purposes {
            if !unique_purposes.contains(purpose) {
                unique_purposes.push(*purpose);
            }
        }

        tracing::trace!(
            subject = %subject,
            alt_names = parsed.len(),
            purposes = unique_purposes.len(),
            "certificate request validated"
        );

        Ok(Self {
            subject,
            alt_names: parsed,
            purposes: unique_purposes,
            validity_days: DEFAULT_VALIDITY_DAYS,
        })
    }

    /// Replaces the validity period.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidValidity`] for zero days.
    pub fn with_validity_days(mut self, days: u32) -> Result<Self, RequestError> {
        if days == 0 {
            return Err(RequestError::InvalidValidity(days));
        }
        self.validity_days = days;
        Ok(self)
    }

    pub fn subject(&self) -> &SubjectName {
        &self.subject
    }

    pub fn alt_names(&self) -> &[SubjectAltName] {
        &self.alt_names
    }

    pub fn purposes(&self) -> &[KeyPurpose] {
        &self.purposes
    }

    pub fn validity_days(&self) -> u32 {
        self.validity_days
    }

    pub fn key_bits(&self) -> u32 {
        RSA_KEY_BITS
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
