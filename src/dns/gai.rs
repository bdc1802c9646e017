//! System DNS lookup using getaddrinfo.
//!
//! This lookup uses the operating system's native resolution via
//! `getaddrinfo`, executed in a thread pool to avoid blocking the async runtime.
//!
//! # When to Use
//!
//! - When you need to respect system resolution (/etc/hosts, nsswitch, ...)
//! - When the resolver should behave exactly like other programs on the host

use super::{Name, Resolve, Resolving};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::net::{IpAddr, Ipv6Addr, ToSocketAddrs};

/// System lookup using `getaddrinfo` in a thread pool.
///
/// Each lookup runs on `tokio::task::spawn_blocking`. A blocking
/// `getaddrinfo` call cannot be interrupted: when a bounded-wait
/// [`Resolver`](super::Resolver) gives up on it, the waiting task is
/// cancelled but the blocking thread still runs the call to completion and
/// its result is discarded.
#[derive(Clone, Debug, Default)]
pub struct GaiResolve;

impl GaiResolve {
    /// Creates a new `GaiResolve`.
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for GaiResolve {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let host = name.as_str().to_string();
            let domain = host.clone();

            let result = tokio::task::spawn_blocking(move || {
                tracing::debug!(host = %host, "resolving via getaddrinfo");
                (host.as_str(), 0u16)
                    .to_socket_addrs()
                    .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<_>>())
            })
            .await;

            // Handle task join error (cancellation, panic)
            let addrs = result
                .map_err(|e| {
                    tracing::error!(error = %e, "DNS resolution task failed");
                    NetError::dns_failed(&domain, std::io::Error::other(e.to_string()))
                })?
                .dns_context(&domain)?;

            tracing::debug!(domain = %domain, count = addrs.len(), "getaddrinfo resolution complete");
            Ok(addrs)
        })
    }
}

/// Parses `host` as an IP address literal.
///
/// Accepts bracketed IPv6 (`[::1]`) as it appears in URLs. Returns `None`
/// for hostnames that need a lookup.
pub fn ip_literal(host: &str) -> Option<IpAddr> {
    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner.parse::<Ipv6Addr>().ok().map(IpAddr::V6);
    }
    host.parse::<IpAddr>().ok()
}
