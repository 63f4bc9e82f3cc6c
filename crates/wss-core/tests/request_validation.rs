//! Integration tests for the wss-core public API.
//!
//! These tests exercise certificate request validation, content-type lookup,
//! and HTTP framing together through the crate-root re-exports, the way the
//! server crate consumes them.

use std::net::IpAddr;

use wss_core::{
    parse_request_head, CertificateRequest, ContentTypeRegistry, DnAttribute, KeyPurpose,
    RequestError, Response, StatusCode, SubjectAltName, DEFAULT_VALIDITY_DAYS, RSA_KEY_BITS,
};

#[test]
fn test_request_keeps_san_order_and_classification() {
    // Arrange
    let sans = ["device-01", "192.168.68.201", "::1", "device-01.lan"];

    // Act
    let request = CertificateRequest::new(
        "CN=SecureWss, O=Example, C=US",
        &sans,
        &[KeyPurpose::ServerAuth],
    )
    .unwrap();

    // Assert
    let expected = vec![
        SubjectAltName::Dns("device-01".to_string()),
        SubjectAltName::Ip("192.168.68.201".parse::<IpAddr>().unwrap()),
        SubjectAltName::Ip("::1".parse::<IpAddr>().unwrap()),
        SubjectAltName::Dns("device-01.lan".to_string()),
    ];
    assert_eq!(request.alt_names(), expected.as_slice());
    assert_eq!(request.subject().common_name(), Some("SecureWss"));
    assert_eq!(request.subject().attributes()[1].0, DnAttribute::Organization);
    assert_eq!(request.key_bits(), RSA_KEY_BITS);
    assert_eq!(request.validity_days(), DEFAULT_VALIDITY_DAYS);
}

#[test]
fn test_request_rejects_each_malformed_input_kind() {
    let purposes = [KeyPurpose::ServerAuth];

    let empty: [&str; 0] = [];
    assert_eq!(
        CertificateRequest::new("CN=x", &empty, &purposes),
        Err(RequestError::NoSubjectAltNames)
    );
    assert!(matches!(
        CertificateRequest::new("CN=x", &["192.168.1.300"], &purposes),
        Err(RequestError::InvalidSubjectAltName { .. })
    ));
    assert!(matches!(
        CertificateRequest::new("CN=x", &["*.example.com"], &purposes),
        Err(RequestError::InvalidSubjectAltName { .. })
    ));
    assert_eq!(
        CertificateRequest::new("CN=x", &["localhost"], &[]),
        Err(RequestError::NoKeyPurposes)
    );
    assert!(matches!(
        CertificateRequest::new("not a dn", &["localhost"], &purposes),
        Err(RequestError::MalformedSubject { .. })
    ));
}

#[test]
fn test_key_purposes_parse_from_config_strings() {
    // Config files spell purposes in kebab-case; CLI users sometimes use
    // underscores or capitals.
    let parsed: Vec<KeyPurpose> = ["server-auth", "CLIENT_AUTH", "code-signing"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    assert_eq!(
        parsed,
        vec![
            KeyPurpose::ServerAuth,
            KeyPurpose::ClientAuth,
            KeyPurpose::CodeSigning
        ]
    );
    assert!("sign-everything".parse::<KeyPurpose>().is_err());
}

#[test]
fn test_get_request_for_stylesheet_resolves_css_type() {
    // Arrange
    let registry = ContentTypeRegistry::new();
    let raw = b"GET /style.css?cache=1 HTTP/1.1\r\nHost: device\r\n\r\n";

    // Act
    let (head, _) = parse_request_head(raw).unwrap().unwrap();
    let response = Response::ok(registry.for_path(head.path()), b"p{}".to_vec());

    // Assert
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.header("Content-Type"), Some("text/css"));
}

#[test]
fn test_head_split_across_reads_completes_on_final_chunk() {
    // Arrange: a client that trickles its request head in two writes.
    let first = b"GET /echo HTTP/1.1\r\nUpgrade: websocket\r\n".to_vec();
    let mut full = first.clone();
    full.extend_from_slice(b"Connection: Upgrade\r\nSec-WebSocket-Key: a2V5\r\n\r\n");

    // Act / Assert
    assert_eq!(parse_request_head(&first), Ok(None));
    let (head, len) = parse_request_head(&full).unwrap().unwrap();
    assert_eq!(len, full.len());
    assert!(head.is_websocket_upgrade());
    assert_eq!(head.websocket_key(), Some("a2V5"));
}
