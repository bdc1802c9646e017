//! Ergonomic error context helpers.
//!
//! Extension traits and helpers that turn IO errors and elapsed deadlines
//! into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::future::Future;
use std::io;
use std::time::Duration;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use failnet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// // Error: "Connection to example.com:443 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(host, port, e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }
}

/// Runs `fut` under `timeout`, mapping an elapsed deadline through `on_elapsed`.
///
/// A zero `timeout` means no deadline.
pub async fn with_deadline<T, F, E>(timeout: Duration, fut: F, on_elapsed: E) -> Result<T, NetError>
where
    F: Future<Output = Result<T, NetError>>,
    E: FnOnce() -> NetError,
{
    if timeout.is_zero() {
        return fut.await;
    }
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_connection_context() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connection_context("example.com", 443).unwrap_err();

        match err {
            NetError::ConnectionFailedTo { host, port, source } => {
                assert_eq!(host, "example.com");
                assert_eq!(port, 443);
                assert_eq!(source.kind(), ErrorKind::ConnectionRefused);
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_dns_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.com").unwrap_err();

        match err {
            NetError::NameNotResolvedFor { domain, .. } => {
                assert_eq!(domain, "unknown.example.com");
            }
            _ => panic!("Expected NameNotResolvedFor"),
        }
    }

    #[tokio::test]
    async fn test_with_deadline_elapsed() {
        let timeout = Duration::from_millis(10);
        let result: Result<(), NetError> = with_deadline(
            timeout,
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            || NetError::RequestTimedOut { timeout },
        )
        .await;

        assert!(matches!(result, Err(NetError::RequestTimedOut { .. })));
    }

    #[tokio::test]
    async fn test_with_deadline_zero_means_unbounded() {
        let result = with_deadline(Duration::ZERO, async { Ok(7) }, || {
            NetError::ConnectionClosed
        })
        .await;

        assert_eq!(result.unwrap(), 7);
    }
}
