//! Async DNS lookup against an explicit list of name servers.
//!
//! Backs [`Resolver::from_servers`](super::Resolver::from_servers) and
//! [`Resolver::from_resolv_conf`](super::Resolver::from_resolv_conf). Queries
//! go straight to the configured servers over UDP (falling back to TCP for
//! truncated answers); the system's own resolver configuration is ignored.

use super::{Name, Resolve, Resolving};
use crate::base::neterror::NetError;
use hickory_resolver::{
    config::{LookupIpStrategy, NameServerConfigGroup, ResolverConfig},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::{Arc, OnceLock},
};

/// Async lookup backed by hickory-dns, bound to fixed name servers.
///
/// The underlying `TokioResolver` is built on first lookup, so constructing
/// one outside a runtime is fine. Clones share the resolver and its
/// connections to the name servers. Answers are never cached.
#[derive(Debug, Clone)]
pub struct HickoryResolve {
    servers: Arc<[SocketAddr]>,
    resolver: Arc<OnceLock<TokioResolver>>,
}

impl HickoryResolve {
    /// Creates a lookup that queries `servers` in order.
    pub fn new(servers: impl Into<Arc<[SocketAddr]>>) -> Self {
        Self {
            servers: servers.into(),
            resolver: Arc::new(OnceLock::new()),
        }
    }

    /// The name servers this lookup queries.
    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    fn resolver(&self) -> &TokioResolver {
        self.resolver.get_or_init(|| {
            let mut group = NameServerConfigGroup::with_capacity(self.servers.len() * 2);
            for server in self.servers.iter() {
                group.merge(NameServerConfigGroup::from_ips_clear(
                    &[server.ip()],
                    server.port(),
                    true,
                ));
            }
            let config = ResolverConfig::from_parts(None, Vec::new(), group);

            let mut builder =
                TokioResolver::builder_with_config(config, TokioConnectionProvider::default());
            let opts = builder.options_mut();
            opts.ip_strategy = LookupIpStrategy::Ipv4thenIpv6;
            // Every lookup goes to the name servers
            opts.cache_size = 0;

            tracing::debug!(servers = ?self.servers, "built hickory-dns resolver");
            builder.build()
        })
    }
}

impl Resolve for HickoryResolve {
    fn resolve(&self, name: Name) -> Resolving {
        let this = self.clone();
        Box::pin(async move {
            let domain = name.as_str();
            tracing::debug!(domain = %domain, "resolving via hickory-dns");

            let lookup = match this.resolver().lookup_ip(domain).await {
                Ok(lookup) => lookup,
                // NXDOMAIN and empty answers mean the name has no addresses
                Err(e) if e.is_no_records_found() || e.is_nx_domain() => {
                    tracing::debug!(domain = %domain, "no records found");
                    return Ok(Vec::new());
                }
                Err(e) => {
                    tracing::debug!(domain = %domain, error = %e, "hickory-dns lookup failed");
                    return Err(NetError::dns_failed(domain, std::io::Error::other(e.to_string())));
                }
            };

            let addrs: Vec<IpAddr> = lookup.iter().collect();

            tracing::debug!(domain = %domain, count = addrs.len(), "hickory-dns resolution complete");
            Ok(addrs)
        })
    }
}
