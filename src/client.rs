//! HTTP Client with builder pattern.
//!
//! The client resolves hostnames itself through a main and a fallback
//! [`Resolver`], pins each POST to one resolved address and fails over to a
//! different address once when the attempt hits a transport error.
//!
//! # Example
//!
//! ```rust,ignore
//! use failnet::Client;
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .timeout(Duration::from_secs(3))
//!     .build();
//!
//! let resp = client
//!     .failover_post("https://example.com/api", "application/json", r#"{"ok":true}"#)
//!     .await?;
//! ```

use crate::base::neterror::NetError;
use crate::dns::{Resolver, ResolverPair};
use crate::http::failover::{lookup_with_fallback, parse_target, FailoverTransaction};
use crate::http::streamfactory::HttpStreamFactory;
use crate::http::HttpResponse;
use crate::socket::connectjob::{
    KeepaliveConfig, TransportConfig, DEFAULT_DIAL_TIMEOUT, DEFAULT_IDLE_CONN_TIMEOUT,
    DEFAULT_TLS_HANDSHAKE_TIMEOUT,
};
use crate::socket::tls::TlsConfig;
use bytes::Bytes;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Overall bound on one request attempt.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Failover HTTP client.
///
/// Timeout setters take `&mut self` and rebuild the transport right away, so
/// in-flight requests keep the configuration they started with. Requests
/// take `&self` and may run concurrently.
#[derive(Clone, Debug)]
pub struct Client {
    timeout: Duration,
    dial_timeout: Duration,
    tls_handshake_timeout: Duration,
    idle_timeout: Duration,
    keepalive: KeepaliveConfig,
    tls: TlsConfig,
    resolvers: ResolverPair,
    transport: Arc<HttpStreamFactory>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default settings.
    ///
    /// Main resolver from `/etc/resolv.conf`, fallback on `8.8.8.8`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            dial_timeout: self.dial_timeout,
            tls_handshake_timeout: self.tls_handshake_timeout,
            idle_timeout: self.idle_timeout,
            keepalive: self.keepalive.clone(),
            tls: self.tls.clone(),
        }
    }

    /// Rebuilds the transport's dial configuration from the current fields.
    ///
    /// The idle pool is kept; pooled connections age out under the new idle
    /// timeout. Calling it repeatedly has no further effect.
    pub fn update_transport(&mut self) {
        let pool = self.transport.pool().clone();
        self.transport = Arc::new(HttpStreamFactory::with_pool(self.transport_config(), pool));
    }

    /// Overall bound on each request attempt.
    pub fn set_connection_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
        self.update_transport();
    }

    pub fn set_transport_dial_timeout(&mut self, timeout: Duration) {
        self.dial_timeout = timeout;
        self.update_transport();
    }

    pub fn set_transport_idle_timeout(&mut self, timeout: Duration) {
        self.idle_timeout = timeout;
        self.update_transport();
    }

    pub fn set_transport_tls_handshake_timeout(&mut self, timeout: Duration) {
        self.tls_handshake_timeout = timeout;
        self.update_transport();
    }

    pub fn set_main_resolver(&mut self, resolver: Resolver) {
        self.resolvers.main = Arc::new(resolver);
    }

    pub fn set_fallback_resolver(&mut self, resolver: Resolver) {
        self.resolvers.fallback = Arc::new(resolver);
    }

    pub fn connection_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn tls_handshake_timeout(&self) -> Duration {
        self.tls_handshake_timeout
    }

    pub fn main_resolver(&self) -> &Arc<Resolver> {
        &self.resolvers.main
    }

    pub fn fallback_resolver(&self) -> &Arc<Resolver> {
        &self.resolvers.fallback
    }

    /// The dial configuration currently in effect.
    pub fn transport(&self) -> &TransportConfig {
        self.transport.config()
    }

    /// Number of idle pooled connections.
    pub fn idle_connections(&self) -> usize {
        self.transport.pool().idle_count()
    }

    /// Resolves the host of `target` the way [`Client::failover_post`] does.
    ///
    /// `target` without a scheme is treated as `https://{target}`. The main
    /// resolver's addresses are returned when it has any; otherwise the
    /// fallback resolver's. Order is preserved.
    pub async fn lookup_for_request(&self, target: &str) -> Result<Vec<IpAddr>, NetError> {
        let url = parse_target(target)?;
        let host = url.host_str().unwrap_or_default();
        lookup_with_fallback(&self.resolvers, host).await
    }

    /// POSTs `body` to `target`, pinned to one resolved address chosen at
    /// random.
    ///
    /// If that attempt fails with a transport error and the host has other
    /// addresses, the request is sent once more to a different one. The
    /// response status is not inspected.
    ///
    /// # Errors
    ///
    /// - [`NetError::CannotResolveHostname`] when neither resolver knows an
    ///   address; no request is sent.
    /// - The attempt's error when only one attempt was made.
    /// - [`NetError::AllAttemptsFailed`] when both attempts failed.
    pub async fn failover_post(
        &self,
        target: &str,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, NetError> {
        let url = parse_target(target)?;
        let mut transaction = FailoverTransaction::new(
            Arc::clone(&self.transport),
            self.resolvers.clone(),
            url,
            content_type,
            body.into(),
            self.timeout,
        )?;
        transaction.start().await?;
        transaction.take_response().ok_or(NetError::ConnectionClosed)
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    timeout: Option<Duration>,
    dial_timeout: Option<Duration>,
    tls_handshake_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
    keepalive: Option<KeepaliveConfig>,
    tls: Option<TlsConfig>,
    main_resolver: Option<Resolver>,
    fallback_resolver: Option<Resolver>,
}

impl ClientBuilder {
    /// Set the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = Some(timeout);
        self
    }

    pub fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = Some(timeout);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn keepalive(mut self, keepalive: KeepaliveConfig) -> Self {
        self.keepalive = Some(keepalive);
        self
    }

    pub fn tls_config(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn main_resolver(mut self, resolver: Resolver) -> Self {
        self.main_resolver = Some(resolver);
        self
    }

    pub fn fallback_resolver(mut self, resolver: Resolver) -> Self {
        self.fallback_resolver = Some(resolver);
        self
    }

    /// Set both resolvers at once.
    pub fn resolvers(mut self, pair: ResolverPair) -> Self {
        self.main_resolver = Some(Arc::unwrap_or_clone(pair.main));
        self.fallback_resolver = Some(Arc::unwrap_or_clone(pair.fallback));
        self
    }

    /// Build the client. Resolvers not set explicitly come from
    /// [`ResolverPair::system_default`].
    pub fn build(self) -> Client {
        let resolvers = match (self.main_resolver, self.fallback_resolver) {
            (Some(main), Some(fallback)) => ResolverPair::new(main, fallback),
            (main, fallback) => {
                let defaults = ResolverPair::system_default();
                ResolverPair {
                    main: main.map(Arc::new).unwrap_or(defaults.main),
                    fallback: fallback.map(Arc::new).unwrap_or(defaults.fallback),
                }
            }
        };

        let mut client = Client {
            timeout: self.timeout.unwrap_or(DEFAULT_CONNECTION_TIMEOUT),
            dial_timeout: self.dial_timeout.unwrap_or(DEFAULT_DIAL_TIMEOUT),
            tls_handshake_timeout: self
                .tls_handshake_timeout
                .unwrap_or(DEFAULT_TLS_HANDSHAKE_TIMEOUT),
            idle_timeout: self.idle_timeout.unwrap_or(DEFAULT_IDLE_CONN_TIMEOUT),
            keepalive: self.keepalive.unwrap_or_default(),
            tls: self.tls.unwrap_or_default(),
            resolvers,
            transport: Arc::new(HttpStreamFactory::default()),
        };
        client.update_transport();
        client
    }
}
