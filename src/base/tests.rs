use crate::base::neterror::{NetError, ResolverRole};
use std::io;
use std::time::Duration;

#[test]
fn test_net_error_codes() {
    assert_eq!(NetError::ConnectionClosed.as_i32(), -100);
    assert_eq!(
        NetError::CannotResolveHostname { host: "example2.com".into() }.as_i32(),
        -105
    );
    assert_eq!(
        NetError::invalid_url("http://[::1", "invalid IPv6 address").as_i32(),
        -300
    );
}

#[test]
fn test_custom_codes_outside_chromium_ranges() {
    let custom = NetError::ResolverNotConfigured { role: ResolverRole::Fallback };
    assert!(custom.as_i32() <= -10000);
}

#[test]
fn test_transport_errors_are_retryable() {
    let refused = NetError::connection_failed_to(
        "example.com",
        443,
        io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
    );
    assert!(refused.is_retryable());
    assert!(NetError::RequestTimedOut { timeout: Duration::from_secs(5) }.is_retryable());
    assert!(NetError::SslHandshakeTimedOut { host: "example.com".into() }.is_retryable());
}

#[test]
fn test_configuration_and_resolution_errors_are_final() {
    assert!(!NetError::ResolverNotConfigured { role: ResolverRole::Main }.is_retryable());
    assert!(!NetError::invalid_url("::", "relative URL without a base").is_retryable());
    assert!(!NetError::CannotResolveHostname { host: "example.com".into() }.is_retryable());
    assert!(!NetError::ResolveTimeout {
        domain: "example.com".into(),
        timeout: Duration::from_millis(10),
    }
    .is_retryable());
}

#[test]
fn test_all_attempts_failed_reports_last_attempt() {
    let first = NetError::ConnectionClosed;
    let last = NetError::RequestTimedOut { timeout: Duration::from_secs(5) };
    let err = NetError::AllAttemptsFailed {
        first: Box::new(first),
        last: Box::new(last),
    };

    assert!(matches!(err.last_attempt(), NetError::RequestTimedOut { .. }));
    assert_eq!(err.as_i32(), -7);
    assert!(!err.is_retryable());

    let message = err.to_string();
    assert!(message.starts_with("Request timed out"));
    assert!(message.contains("Connection closed"));
}

#[test]
fn test_resolve_timeout_distinct_from_empty_resolution() {
    let timeout = NetError::ResolveTimeout {
        domain: "example.com".into(),
        timeout: Duration::from_millis(10),
    };
    assert!(!matches!(timeout, NetError::CannotResolveHostname { .. }));
    assert!(timeout.to_string().contains("timed out"));
}
