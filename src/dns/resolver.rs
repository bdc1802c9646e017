//! The resolver a client holds: name servers, a lookup capability and an
//! optional bounded wait.

use super::gai::{ip_literal, GaiResolve};
use super::hickory::HickoryResolve;
use super::resolvconf::{read_resolv_conf, DNS_PORT};
use super::{Name, Resolve};
use crate::base::neterror::{NetError, ResolverRole};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// resolv.conf read by [`ResolverPair::system_default`] and [`Resolver::system`].
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Public resolver used as the default fallback.
pub const DEFAULT_FALLBACK_SERVER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// Bounded wait applied to the default resolver pair.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

/// A zero wait means unbounded, as everywhere else in the crate.
fn bounded(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

/// Maps hostnames to addresses through a pluggable [`Resolve`] capability.
///
/// A resolver also carries the list of DNS servers it is configured with. A
/// resolver with no servers is unusable: lookups fail with
/// [`NetError::ResolverNotConfigured`] instead of reporting that the host
/// has no addresses.
///
/// # Bounded wait
///
/// With a timeout set, each lookup runs on its own task raced against a
/// timer. When the timer wins the lookup task is aborted and the call fails
/// with [`NetError::ResolveTimeout`].
#[derive(Clone)]
pub struct Resolver {
    servers: Arc<[SocketAddr]>,
    lookup: Arc<dyn Resolve>,
    timeout: Option<Duration>,
}

impl Resolver {
    /// Resolver querying the name servers listed in a resolv.conf file.
    ///
    /// An unreadable file yields a resolver with no servers.
    pub fn from_resolv_conf(path: impl AsRef<Path>, timeout: Option<Duration>) -> Self {
        let path = path.as_ref();
        let servers = read_resolv_conf(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "failed to read resolv.conf");
            Vec::new()
        });
        Self::from_server_addrs(servers, timeout)
    }

    /// Resolver querying explicit name server IPs on port 53.
    pub fn from_servers(servers: impl IntoIterator<Item = IpAddr>, timeout: Option<Duration>) -> Self {
        Self::from_server_addrs(
            servers.into_iter().map(|ip| SocketAddr::new(ip, DNS_PORT)),
            timeout,
        )
    }

    /// Resolver querying explicit name server socket addresses.
    pub fn from_server_addrs(
        servers: impl IntoIterator<Item = SocketAddr>,
        timeout: Option<Duration>,
    ) -> Self {
        let servers: Arc<[SocketAddr]> = servers.into_iter().collect();
        Self {
            lookup: Arc::new(HickoryResolve::new(Arc::clone(&servers))),
            servers,
            timeout: bounded(timeout),
        }
    }

    /// Resolver backed by a caller-supplied lookup capability.
    ///
    /// `servers` only feeds the configuration check; `lookup` decides what
    /// it actually queries. No bounded wait is applied unless added with
    /// [`Resolver::with_timeout`].
    pub fn from_lookup(
        servers: impl IntoIterator<Item = SocketAddr>,
        lookup: impl Resolve + 'static,
    ) -> Self {
        Self {
            servers: servers.into_iter().collect(),
            lookup: Arc::new(lookup),
            timeout: None,
        }
    }

    /// Resolver using the operating system's getaddrinfo.
    ///
    /// Its server list is read from `/etc/resolv.conf`, the servers the
    /// system resolver itself uses.
    pub fn system(timeout: Option<Duration>) -> Self {
        let servers = read_resolv_conf(DEFAULT_RESOLV_CONF).unwrap_or_default();
        Self {
            servers: servers.into(),
            lookup: Arc::new(GaiResolve::new()),
            timeout: bounded(timeout),
        }
    }

    /// Replaces the bounded wait. `None` or a zero duration lets lookups run
    /// unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = bounded(timeout);
        self
    }

    /// The configured DNS servers.
    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Whether at least one DNS server is configured.
    pub fn is_configured(&self) -> bool {
        !self.servers.is_empty()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolves `host` to addresses, in the order the lookup returned them.
    ///
    /// IP literals are returned as is without a lookup. An empty result
    /// means the host currently has no addresses.
    pub async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, NetError> {
        self.lookup_as(host, ResolverRole::Direct).await
    }

    pub(crate) async fn lookup_as(
        &self,
        host: &str,
        role: ResolverRole,
    ) -> Result<Vec<IpAddr>, NetError> {
        if host.is_empty() {
            return Err(NetError::invalid_url(host, "empty host"));
        }
        if let Some(ip) = ip_literal(host) {
            return Ok(vec![ip]);
        }
        if !self.is_configured() {
            return Err(NetError::ResolverNotConfigured { role });
        }

        let resolving = self.lookup.resolve(Name::new(host));
        let Some(timeout) = self.timeout else {
            return resolving.await;
        };

        let mut task = tokio::spawn(resolving);
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!(domain = %host, error = %join_err, "lookup task failed");
                Err(NetError::dns_failed(host, std::io::Error::other(join_err.to_string())))
            }
            Err(_) => {
                task.abort();
                tracing::debug!(domain = %host, ?timeout, role = %role, "lookup timed out");
                Err(NetError::ResolveTimeout {
                    domain: host.to_string(),
                    timeout,
                })
            }
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("servers", &self.servers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The main and fallback resolvers of a client.
#[derive(Clone, Debug)]
pub struct ResolverPair {
    pub main: Arc<Resolver>,
    pub fallback: Arc<Resolver>,
}

impl ResolverPair {
    pub fn new(main: Resolver, fallback: Resolver) -> Self {
        Self {
            main: Arc::new(main),
            fallback: Arc::new(fallback),
        }
    }

    /// Main resolver from `/etc/resolv.conf`, fallback on `8.8.8.8`, both
    /// with [`DEFAULT_RESOLVE_TIMEOUT`].
    pub fn system_default() -> Self {
        Self::new(
            Resolver::from_resolv_conf(DEFAULT_RESOLV_CONF, Some(DEFAULT_RESOLVE_TIMEOUT)),
            Resolver::from_servers([DEFAULT_FALLBACK_SERVER], Some(DEFAULT_RESOLVE_TIMEOUT)),
        )
    }
}
