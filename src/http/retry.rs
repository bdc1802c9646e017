//! Address selection and retry policy for failover requests.
//!
//! A request is tried against one address drawn uniformly from the resolved
//! set. When that attempt fails with a transport error and more than one
//! address is known, a second address is drawn uniformly from the others.
//! There is no third attempt and no backoff between the two.

use crate::base::neterror::NetError;
use rand::Rng;

/// Upper bound on attempts per request.
pub const MAX_ATTEMPTS: usize = 2;

/// Why an attempt may be repeated on another address (mirrors Chromium's
/// RetryReason enum, restricted to what HTTP/1.1 over TCP can report).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// TCP connect refused, reset or otherwise failed
    ConnectionFailed,
    /// Dial exceeded its timeout
    ConnectionTimedOut,
    /// Connection was closed during request
    ConnectionClosed,
    /// TLS handshake failed or timed out
    SslHandshake,
    /// Whole attempt exceeded the request timeout
    RequestTimedOut,
    /// Malformed HTTP exchange
    HttpProtocol,
}

impl RetryReason {
    /// Map a NetError to a RetryReason, if the error is retryable.
    pub fn from_error(error: &NetError) -> Option<Self> {
        match error {
            NetError::ConnectionFailedTo { .. } => Some(Self::ConnectionFailed),
            NetError::ConnectionTimedOut { .. } => Some(Self::ConnectionTimedOut),
            NetError::ConnectionClosed => Some(Self::ConnectionClosed),
            NetError::SslProtocolError
            | NetError::SslHandshakeFailed { .. }
            | NetError::SslHandshakeTimedOut { .. } => Some(Self::SslHandshake),
            NetError::RequestTimedOut { .. } => Some(Self::RequestTimedOut),
            NetError::Http { .. } => Some(Self::HttpProtocol),
            _ => None,
        }
    }
}

/// Index of the first address to try, uniform in `[0, len)`.
pub fn select_first<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    (len > 0).then(|| rng.gen_range(0..len))
}

/// Index of the retry address, uniform over `[0, len)` without `exclude`.
///
/// `None` when there is no other address to pick.
pub fn select_alternate<R: Rng + ?Sized>(len: usize, exclude: usize, rng: &mut R) -> Option<usize> {
    if len < 2 || exclude >= len {
        return None;
    }
    let j = rng.gen_range(0..len - 1);
    Some(if j >= exclude { j + 1 } else { j })
}

/// Whether an attempt that failed with `error` after `attempts` tries, out
/// of `candidates` addresses, gets another try.
pub fn should_retry(error: &NetError, attempts: usize, candidates: usize) -> bool {
    attempts < MAX_ATTEMPTS && candidates > 1 && RetryReason::from_error(error).is_some()
}
