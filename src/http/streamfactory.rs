use crate::base::neterror::NetError;
use crate::socket::client::StreamSocket;
use crate::socket::connectjob::{host_and_port, ConnectJob, DialRoute, TransportConfig};
use crate::socket::pool::{ConnectionPool, Http1Sender, PoolKey};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::spawn;
use url::Url;

/// A failed send on an [`HttpStream`].
#[derive(Debug)]
pub struct SendFailure {
    pub error: NetError,
    /// The request, if none of it reached the connection.
    pub unsent: Option<Request<Full<Bytes>>>,
}

/// An HTTP/1.1 connection ready to carry one request.
/// Equivalent to net::HttpStream.
pub struct HttpStream {
    sender: Http1Sender,
    key: PoolKey,
    reused: bool,
}

impl HttpStream {
    pub async fn send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, NetError> {
        self.sender.send_request(req).await.map_err(|e| {
            tracing::debug!(key = ?self.key, reused = self.reused, error = %e, "request failed");
            NetError::from(e)
        })
    }

    /// Like [`send_request`](Self::send_request), but hands the request back
    /// when the connection closed before any of it was written.
    pub async fn try_send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, SendFailure> {
        self.sender.try_send_request(req).await.map_err(|mut e| {
            let unsent = e.take_message();
            let error = NetError::from(e.into_error());
            tracing::debug!(
                key = ?self.key,
                reused = self.reused,
                written = unsent.is_none(),
                error = %error,
                "request failed"
            );
            SendFailure { error, unsent }
        })
    }

    /// Whether the connection came from the idle pool.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn key(&self) -> &PoolKey {
        &self.key
    }
}

/// The transport: dial configuration plus the idle connection pool.
#[derive(Debug, Default)]
pub struct HttpStreamFactory {
    config: TransportConfig,
    pool: ConnectionPool,
}

impl HttpStreamFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self::with_pool(config, ConnectionPool::new())
    }

    /// Transport sharing an existing pool, e.g. after a configuration change.
    pub fn with_pool(config: TransportConfig, pool: ConnectionPool) -> Self {
        Self { config, pool }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn pool_key(url: &Url, route: Option<&DialRoute>) -> Result<PoolKey, NetError> {
        let (host, port) = host_and_port(url)?;
        let pinned = route.and_then(|r| r.target_for(host, port)).map(|a| a.ip());
        PoolKey::new(url, pinned).ok_or_else(|| NetError::invalid_url(url.as_str(), "missing host"))
    }

    /// Returns an idle pooled connection for the target if one is usable,
    /// otherwise opens a new one.
    pub async fn create_stream(
        &self,
        url: &Url,
        route: Option<&DialRoute>,
    ) -> Result<HttpStream, NetError> {
        let key = Self::pool_key(url, route)?;
        if let Some(sender) = self.pool.checkout(&key, self.config.idle_timeout) {
            tracing::trace!(?key, "reusing idle connection");
            return Ok(HttpStream {
                sender,
                key,
                reused: true,
            });
        }
        self.create_fresh_stream(url, route).await
    }

    /// Always opens a new connection, bypassing the pool.
    pub async fn create_fresh_stream(
        &self,
        url: &Url,
        route: Option<&DialRoute>,
    ) -> Result<HttpStream, NetError> {
        let key = Self::pool_key(url, route)?;

        // 1. Get raw socket
        let socket = ConnectJob::new(&self.config).connect(url, route).await?;
        tracing::debug!(?key, peer = ?socket.peer_addr(), tls = socket.is_ssl(), "connected");

        // 2. Handshake
        let io = TokioIo::new(socket);
        let (sender, conn) = http1::handshake(io).await.map_err(NetError::from)?;

        // 3. Spawn the connection driver
        spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection driver exited with error");
            }
        });

        Ok(HttpStream {
            sender,
            key,
            reused: false,
        })
    }

    /// Hands a stream whose response headers have arrived back to the pool.
    pub fn release_stream(&self, stream: HttpStream) {
        self.pool
            .checkin(stream.key, stream.sender, self.config.idle_timeout);
    }
}
