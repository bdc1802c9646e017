//! DNS Resolution Module
//!
//! Provides pluggable DNS resolution with support for:
//! - Explicit name servers or resolv.conf (hickory-dns)
//! - System resolver (getaddrinfo via thread pool)
//! - Caller-supplied lookups (closures, fixed host tables)
//! - Bounded-wait lookups raced against a timer
//!
//! # Architecture
//!
//! The `Resolve` trait is the lookup capability. [`Resolver`] wraps one with
//! the list of DNS servers it is configured for and an optional deadline; a
//! client holds two of them, main and fallback ([`ResolverPair`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use failnet::dns::Resolver;
//! use std::time::Duration;
//!
//! let resolver = Resolver::from_servers(["1.1.1.1".parse()?], Some(Duration::from_secs(1)));
//! for addr in resolver.lookup("example.com").await? {
//!     println!("Resolved: {}", addr);
//! }
//! ```

mod gai;
mod hickory;
mod resolvconf;
mod resolve;
mod resolver;

pub use gai::{ip_literal, GaiResolve};
pub use hickory::HickoryResolve;
pub use resolvconf::{parse_resolv_conf, read_resolv_conf, DNS_PORT};
pub use resolve::{Name, Resolve, ResolveFn, Resolving, StaticResolve};
pub use resolver::{
    Resolver, ResolverPair, DEFAULT_FALLBACK_SERVER, DEFAULT_RESOLVE_TIMEOUT, DEFAULT_RESOLV_CONF,
};
