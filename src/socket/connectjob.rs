use crate::base::context::{with_deadline, IoResultExt};
use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::tls::TlsConfig;
use socket2::{SockRef, TcpKeepalive};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

/// Dial timeout used by a default transport.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(1);
/// TLS handshake timeout used by a default transport.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
/// How long an idle pooled connection stays reusable.
pub const DEFAULT_IDLE_CONN_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP keepalive probing applied to every dialed socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepaliveConfig {
    pub enabled: bool,
    /// Idle time before the first probe.
    pub time: Duration,
    /// Time between unanswered probes.
    pub interval: Duration,
    /// Unanswered probes before the connection is dropped.
    pub retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: Duration::from_secs(15),
            interval: Duration::from_secs(15),
            retries: 9,
        }
    }
}

impl KeepaliveConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn to_socket2(&self) -> TcpKeepalive {
        let keepalive = TcpKeepalive::new().with_time(self.time);
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            windows
        ))]
        let keepalive = keepalive.with_interval(self.interval);
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd"
        ))]
        let keepalive = keepalive.with_retries(self.retries);
        keepalive
    }
}

/// Dial parameters of a transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Bound on establishing the TCP connection. Zero means unbounded.
    pub dial_timeout: Duration,
    /// Bound on the TLS handshake. Zero means unbounded.
    pub tls_handshake_timeout: Duration,
    /// How long an idle connection may wait in the pool.
    pub idle_timeout: Duration,
    pub keepalive: KeepaliveConfig,
    pub tls: TlsConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_CONN_TIMEOUT,
            keepalive: KeepaliveConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

/// Pins connections for one host to a chosen address.
///
/// A route lives for a single request attempt. Connections whose target host
/// matches are dialed at `addr` on the URL's port; any other host is
/// resolved normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRoute {
    host: String,
    addr: IpAddr,
}

impl DialRoute {
    pub fn new(host: impl Into<String>, addr: IpAddr) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            addr,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The socket address to dial for `host:port`, if this route covers `host`.
    pub fn target_for(&self, host: &str, port: u16) -> Option<SocketAddr> {
        host.eq_ignore_ascii_case(&self.host)
            .then(|| SocketAddr::new(self.addr, port))
    }
}

/// Host and port a URL connects to.
pub fn host_and_port(url: &Url) -> Result<(&str, u16), NetError> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| NetError::invalid_url(url.as_str(), "missing host"))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| NetError::invalid_url(url.as_str(), "unknown port"))?;
    Ok((host, port))
}

/// Manages the connection process: route/DNS -> TCP -> keepalive -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob<'a> {
    config: &'a TransportConfig,
}

impl<'a> ConnectJob<'a> {
    pub fn new(config: &'a TransportConfig) -> Self {
        Self { config }
    }

    pub async fn connect(
        &self,
        url: &Url,
        route: Option<&DialRoute>,
    ) -> Result<SocketType, NetError> {
        let (host, port) = host_and_port(url)?;
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(NetError::invalid_url(
                url.as_str(),
                format!("unsupported scheme {scheme}"),
            ));
        }

        // 1. Target addresses: pinned by the route, else normal resolution
        let targets = match route.and_then(|r| r.target_for(host, port)) {
            Some(addr) => vec![addr],
            None => self.resolve(host, port).await?,
        };

        // 2. TCP connect, first address that accepts wins
        let mut last_err = None;
        let mut stream = None;
        for addr in targets {
            match self.dial(addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "dial failed");
                    last_err = Some(e);
                }
            }
        }
        let stream = match (stream, last_err) {
            (Some(s), _) => s,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(NetError::CannotResolveHostname {
                    host: host.to_string(),
                })
            }
        };

        // 3. Keepalive, best effort
        self.apply_keepalive(&stream);

        // 4. SSL Handshake (if https)
        if scheme == "https" {
            let tls_stream = self.handshake(host, stream).await?;
            Ok(SocketType::Ssl(tls_stream))
        } else {
            Ok(SocketType::Tcp(stream))
        }
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, NetError> {
        if let Some(ip) = crate::dns::ip_literal(host) {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let addrs = tokio::net::lookup_host((host, port)).await.dns_context(host)?;
        Ok(addrs.collect())
    }

    async fn dial(&self, addr: SocketAddr) -> Result<TcpStream, NetError> {
        let timeout = self.config.dial_timeout;
        with_deadline(
            timeout,
            async {
                TcpStream::connect(addr)
                    .await
                    .connection_context(&addr.ip().to_string(), addr.port())
            },
            || NetError::ConnectionTimedOut { addr, timeout },
        )
        .await
    }

    fn apply_keepalive(&self, stream: &TcpStream) {
        let keepalive = &self.config.keepalive;
        if !keepalive.enabled {
            return;
        }
        let sock = SockRef::from(stream);
        if let Err(e) = sock.set_tcp_keepalive(&keepalive.to_socket2()) {
            tracing::debug!(error = %e, "failed to set TCP keepalive");
        }
    }

    async fn handshake(
        &self,
        host: &str,
        stream: TcpStream,
    ) -> Result<tokio_boring::SslStream<TcpStream>, NetError> {
        let tls = &self.config.tls;
        let connector = tls.connector()?;
        let mut config = connector.configure().map_err(|_| NetError::SslProtocolError)?;
        config.set_use_server_name_indication(TlsConfig::should_set_sni(host));
        config.set_verify_hostname(tls.verify_certificates);

        // Bracketed IPv6 hosts are verified against the bare address
        let domain = host.trim_start_matches('[').trim_end_matches(']');
        with_deadline(
            self.config.tls_handshake_timeout,
            async {
                tokio_boring::connect(config, domain, stream).await.map_err(|e| {
                    tracing::debug!(host = %domain, error = ?e, "SSL handshake failed");
                    NetError::SslHandshakeFailed {
                        host: domain.to_string(),
                        reason: format!("{e:?}"),
                    }
                })
            },
            || NetError::SslHandshakeTimedOut {
                host: domain.to_string(),
            },
        )
        .await
    }
}
