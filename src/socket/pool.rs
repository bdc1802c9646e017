use bytes::Bytes;
use dashmap::DashMap;
use http_body_util::Full;
use hyper::client::conn::http1::SendRequest;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Request sender of an established HTTP/1.1 connection.
pub type Http1Sender = SendRequest<Full<Bytes>>;

/// Identifies a connection group (scheme, host, port, pinned address).
///
/// Connections dialed under a [`DialRoute`](crate::socket::connectjob::DialRoute)
/// carry the pinned address, so an attempt pinned to one address never picks
/// up a connection to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    scheme: String,
    host: String,
    port: u16,
    addr: Option<IpAddr>,
}

impl PoolKey {
    pub fn new(url: &Url, addr: Option<IpAddr>) -> Option<Self> {
        Some(PoolKey {
            scheme: url.scheme().to_string(),
            host: url.host_str()?.to_ascii_lowercase(),
            port: url.port_or_known_default()?,
            addr,
        })
    }

    pub fn addr(&self) -> Option<IpAddr> {
        self.addr
    }
}

/// Idle connection with metadata for timeout tracking.
struct IdleConnection {
    sender: Http1Sender,
    /// When this connection was returned to the pool
    start_time: Instant,
}

impl IdleConnection {
    fn is_expired(&self, idle_timeout: Duration, now: Instant) -> bool {
        now.duration_since(self.start_time) >= idle_timeout
    }
}

/// Pool of idle keep-alive HTTP/1.1 connections.
///
/// The idle timeout is passed on every call rather than stored, so a
/// transport rebuilt with a new timeout keeps the same pool and existing
/// connections age out under the new value. Dropping an idle sender closes
/// its connection once the driver task notices.
#[derive(Clone, Default)]
pub struct ConnectionPool {
    groups: Arc<DashMap<PoolKey, VecDeque<IdleConnection>>>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("groups", &self.groups.len())
            .field("idle", &self.idle_count())
            .finish()
    }
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reusable idle connection for `key`, most recently used first.
    ///
    /// Closed and expired connections found on the way are discarded.
    pub fn checkout(&self, key: &PoolKey, idle_timeout: Duration) -> Option<Http1Sender> {
        let mut group = self.groups.get_mut(key)?;
        let now = Instant::now();
        let mut busy = Vec::new();
        let mut found = None;

        while let Some(idle) = group.pop_back() {
            if idle.sender.is_closed() || idle.is_expired(idle_timeout, now) {
                tracing::trace!(?key, "discarding stale idle connection");
                continue;
            }
            if !idle.sender.is_ready() {
                busy.push(idle);
                continue;
            }
            found = Some(idle.sender);
            break;
        }

        // Connections still finishing a previous response keep their slot
        for idle in busy.into_iter().rev() {
            group.push_back(idle);
        }
        let empty = group.is_empty();
        drop(group);
        if empty {
            self.groups.remove_if(key, |_, g| g.is_empty());
        }
        found
    }

    /// Returns a connection to the pool after its response headers arrived.
    pub fn checkin(&self, key: PoolKey, sender: Http1Sender, idle_timeout: Duration) {
        if sender.is_closed() || idle_timeout.is_zero() {
            return;
        }
        self.cleanup_idle(idle_timeout);
        self.groups.entry(key).or_default().push_back(IdleConnection {
            sender,
            start_time: Instant::now(),
        });
    }

    /// Drops every closed or expired idle connection.
    pub fn cleanup_idle(&self, idle_timeout: Duration) {
        let now = Instant::now();
        self.groups.retain(|_, group| {
            group.retain(|idle| !idle.sender.is_closed() && !idle.is_expired(idle_timeout, now));
            !group.is_empty()
        });
    }

    /// Number of idle connections currently held.
    pub fn idle_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    /// Closes every idle connection.
    pub fn clear(&self) {
        self.groups.clear();
    }
}
