//! Core DNS resolution types and traits.
//!
//! This module defines the `Resolve` trait, the lookup capability every
//! [`Resolver`](super::Resolver) wraps, plus the two in-process
//! implementations: closures ([`ResolveFn`]) and fixed host tables
//! ([`StaticResolve`]).

use crate::base::neterror::NetError;
use std::{collections::HashMap, fmt, future::Future, net::IpAddr, pin::Pin, sync::Arc};

/// A domain name to resolve into IP addresses.
///
/// This is a lightweight wrapper around a hostname string that provides
/// a type-safe way to pass domain names to resolvers.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Alias for the `Future` type returned by a lookup capability.
///
/// Resolves to the addresses in the order the source returned them. An
/// empty list with no error means the name currently has no addresses.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Vec<IpAddr>, NetError>> + Send>>;

/// A hostname lookup capability.
///
/// # Design Notes
///
/// - Uses `&self` for concurrent resolution without mutable access.
/// - Returns boxed `'static` futures so a lookup can be moved onto its own
///   task and raced against a deadline.
pub trait Resolve: Send + Sync {
    /// Resolves a domain name to IP addresses.
    fn resolve(&self, name: Name) -> Resolving;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name) -> Resolving {
        (**self).resolve(name)
    }
}

/// Adapts a plain function `host -> addresses` into a [`Resolve`].
///
/// ```rust,ignore
/// use failnet::dns::ResolveFn;
///
/// let lookup = ResolveFn::new(|host: &str| match host {
///     "api.local" => Ok(vec!["127.0.0.1".parse().unwrap()]),
///     _ => Ok(Vec::new()),
/// });
/// ```
pub struct ResolveFn<F> {
    f: F,
}

impl<F> ResolveFn<F>
where
    F: Fn(&str) -> Result<Vec<IpAddr>, NetError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Resolve for ResolveFn<F>
where
    F: Fn(&str) -> Result<Vec<IpAddr>, NetError> + Send + Sync,
{
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(std::future::ready((self.f)(name.as_str())))
    }
}

impl<F> fmt::Debug for ResolveFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveFn").finish_non_exhaustive()
    }
}

/// Fixed hostname table, optionally layered over another lookup.
///
/// Hostnames in the table resolve to their listed addresses (which may be
/// empty). Misses go to the inner lookup when there is one and resolve to
/// no addresses otherwise. Useful for:
/// - Testing without real DNS
/// - Forcing specific IPs for certain domains
///
/// # Example
///
/// ```rust,ignore
/// use failnet::dns::StaticResolve;
///
/// let table = StaticResolve::from_iter([
///     ("example.com", vec!["1.1.1.1".parse().unwrap(), "2.2.2.2".parse().unwrap()]),
/// ]);
/// ```
#[derive(Clone)]
pub struct StaticResolve {
    inner: Option<Arc<dyn Resolve>>,
    overrides: Arc<HashMap<String, Vec<IpAddr>>>,
}

impl StaticResolve {
    /// A table with no fallback lookup.
    pub fn new(overrides: HashMap<String, Vec<IpAddr>>) -> Self {
        Self {
            inner: None,
            overrides: Arc::new(lowercase_keys(overrides)),
        }
    }

    /// A table consulted before `inner`.
    pub fn with_inner(inner: Arc<dyn Resolve>, overrides: HashMap<String, Vec<IpAddr>>) -> Self {
        Self {
            inner: Some(inner),
            overrides: Arc::new(lowercase_keys(overrides)),
        }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

fn lowercase_keys(overrides: HashMap<String, Vec<IpAddr>>) -> HashMap<String, Vec<IpAddr>> {
    overrides
        .into_iter()
        .map(|(host, addrs)| (host.to_ascii_lowercase(), addrs))
        .collect()
}

impl<K: Into<String>> FromIterator<(K, Vec<IpAddr>)> for StaticResolve {
    fn from_iter<T: IntoIterator<Item = (K, Vec<IpAddr>)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Resolve for StaticResolve {
    fn resolve(&self, name: Name) -> Resolving {
        let key = name.as_str().to_ascii_lowercase();
        if let Some(addrs) = self.overrides.get(&key) {
            return Box::pin(std::future::ready(Ok(addrs.clone())));
        }
        match &self.inner {
            Some(inner) => inner.resolve(name),
            None => Box::pin(std::future::ready(Ok(Vec::new()))),
        }
    }
}

impl fmt::Debug for StaticResolve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolve")
            .field("override_count", &self.overrides.len())
            .field("has_inner", &self.inner.is_some())
            .finish()
    }
}
