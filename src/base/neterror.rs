use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Which of the client's two resolvers an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverRole {
    Main,
    Fallback,
    /// A resolver used on its own, outside a client.
    Direct,
}

impl fmt::Display for ResolverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverRole::Main => f.write_str("main"),
            ResolverRole::Fallback => f.write_str("fallback"),
            ResolverRole::Direct => f.write_str("direct"),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Configuration Errors
    #[error("{role} resolver has no configured DNS servers")]
    ResolverNotConfigured { role: ResolverRole },

    // Input Errors
    #[error("Invalid URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },

    // Resolution Errors
    #[error("Name resolution failed for {domain}: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Resolving {domain} timed out after {timeout:?}")]
    ResolveTimeout { domain: String, timeout: Duration },
    #[error("Can't lookup hostname {host}")]
    CannotResolveHostname { host: String },

    // Connection Errors
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Connection to {addr} timed out after {timeout:?}")]
    ConnectionTimedOut { addr: SocketAddr, timeout: Duration },
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("SSL handshake with {host} failed: {reason}")]
    SslHandshakeFailed { host: String, reason: String },
    #[error("SSL handshake with {host} timed out")]
    SslHandshakeTimedOut { host: String },

    // HTTP Errors
    #[error("Request timed out after {timeout:?}")]
    RequestTimedOut { timeout: Duration },
    #[error("HTTP error: {reason}")]
    Http { reason: String },
    #[error("Failed to read response body")]
    HttpBodyError,
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("Response body is not valid JSON")]
    JsonParseError,

    // Failover
    #[error("{last} (previous attempt: {first})")]
    AllAttemptsFailed {
        first: Box<NetError>,
        last: Box<NetError>,
    },
}

impl NetError {
    /// Connection failure with the target host and port attached.
    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            source: Arc::new(source),
        }
    }

    /// Lookup failure for `domain`.
    pub fn dns_failed(domain: &str, source: io::Error) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn invalid_url(input: &str, reason: impl fmt::Display) -> Self {
        NetError::InvalidUrl {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether a failed attempt with this error may be repeated against
    /// another address.
    ///
    /// Only transport-level failures qualify. Configuration, input and
    /// resolution errors are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionClosed
                | NetError::ConnectionFailedTo { .. }
                | NetError::ConnectionTimedOut { .. }
                | NetError::SslProtocolError
                | NetError::SslHandshakeFailed { .. }
                | NetError::SslHandshakeTimedOut { .. }
                | NetError::RequestTimedOut { .. }
                | NetError::Http { .. }
        )
    }

    /// The error of the last attempt made.
    ///
    /// For [`NetError::AllAttemptsFailed`] this is the error of the retry;
    /// every other error is returned as is.
    pub fn last_attempt(&self) -> &NetError {
        match self {
            NetError::AllAttemptsFailed { last, .. } => last.last_attempt(),
            other => other,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::CannotResolveHostname { .. } => -105,
            NetError::SslProtocolError => -107,
            NetError::SslHandshakeFailed { .. } => -107,
            NetError::ConnectionTimedOut { .. } => -118,
            NetError::SslHandshakeTimedOut { .. } => -118,
            NetError::NameNotResolvedFor { .. } => -137,
            NetError::ResolveTimeout { .. } => -137,
            NetError::RequestTimedOut { .. } => -7,
            NetError::InvalidUrl { .. } => -300,
            NetError::Http { .. } => -320,
            // Codes outside Chromium's net_error_list.h ranges
            NetError::ResolverNotConfigured { .. } => -10001,
            NetError::HttpBodyError => -10002,
            NetError::InvalidUtf8 => -10003,
            NetError::JsonParseError => -10004,
            NetError::AllAttemptsFailed { last, .. } => last.as_i32(),
        }
    }
}

impl From<hyper::Error> for NetError {
    fn from(e: hyper::Error) -> Self {
        if e.is_closed() || e.is_canceled() || e.is_incomplete_message() {
            NetError::ConnectionClosed
        } else {
            NetError::Http {
                reason: e.to_string(),
            }
        }
    }
}
