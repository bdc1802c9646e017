//! Failover POST: resolve, pin one address, retry once on another.

use crate::base::context::with_deadline;
use crate::base::neterror::{NetError, ResolverRole};
use crate::dns::ResolverPair;
use crate::http::response::HttpResponse;
use crate::http::retry::{select_alternate, select_first, should_retry};
use crate::http::streamfactory::{HttpStreamFactory, SendFailure};
use crate::socket::connectjob::DialRoute;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, HOST, USER_AGENT};
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use url::{Position, Url};

const USER_AGENT_VALUE: &str = concat!("failnet/", env!("CARGO_PKG_VERSION"));

/// Parses a request target, defaulting to `https://` when no scheme is given.
pub fn parse_target(target: &str) -> Result<Url, NetError> {
    let url = if target.contains("://") {
        Url::parse(target)
    } else {
        Url::parse(&format!("https://{target}"))
    }
    .map_err(|e| NetError::invalid_url(target, e))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(NetError::invalid_url(target, "missing host")),
    }
}

/// Resolves `host` with the main resolver, falling back when it yields nothing.
///
/// The main resolver is skipped when it has no servers. A main lookup error
/// counts as an empty result. The fallback is always consulted in that case
/// and its error, if any, is returned as is.
pub async fn lookup_with_fallback(
    resolvers: &ResolverPair,
    host: &str,
) -> Result<Vec<IpAddr>, NetError> {
    let main = &resolvers.main;
    if main.is_configured() {
        match main.lookup_as(host, ResolverRole::Main).await {
            Ok(addrs) if !addrs.is_empty() => {
                tracing::debug!(domain = %host, count = addrs.len(), "resolved with main resolver");
                return Ok(addrs);
            }
            Ok(_) => tracing::debug!(domain = %host, "main resolver returned no addresses"),
            Err(e) => tracing::warn!(domain = %host, error = %e, "main resolver failed"),
        }
    }

    let addrs = resolvers
        .fallback
        .lookup_as(host, ResolverRole::Fallback)
        .await?;
    tracing::debug!(domain = %host, count = addrs.len(), "resolved with fallback resolver");
    Ok(addrs)
}

/// Internal state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Resolving,
    /// Attempt against the address at this index
    Attempt(usize),
    Done,
    Failed,
}

/// One failover POST from resolution to response.
///
/// Each attempt carries its own [`DialRoute`], so concurrent transactions
/// sharing a transport never see each other's pinned address.
pub struct FailoverTransaction {
    factory: Arc<HttpStreamFactory>,
    resolvers: ResolverPair,
    url: Url,
    content_type: HeaderValue,
    body: Bytes,
    timeout: Duration,
    rng: StdRng,
    state: State,
    addrs: Vec<IpAddr>,
    tried: Vec<IpAddr>,
    first_error: Option<NetError>,
    response: Option<(Response<Incoming>, IpAddr)>,
}

impl FailoverTransaction {
    /// `timeout` bounds each attempt as a whole; zero means unbounded.
    pub fn new(
        factory: Arc<HttpStreamFactory>,
        resolvers: ResolverPair,
        url: Url,
        content_type: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<Self, NetError> {
        let content_type = HeaderValue::from_str(content_type).map_err(|e| NetError::Http {
            reason: format!("invalid content type {content_type:?}: {e}"),
        })?;
        Ok(Self {
            factory,
            resolvers,
            url,
            content_type,
            body,
            timeout,
            rng: StdRng::from_entropy(),
            state: State::Resolving,
            addrs: Vec::new(),
            tried: Vec::new(),
            first_error: None,
            response: None,
        })
    }

    /// Replaces the address selection RNG, for reproducible selection.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Runs the transaction until a response arrives or every allowed
    /// attempt has failed.
    pub async fn start(&mut self) -> Result<(), NetError> {
        self.state = State::Resolving;
        self.tried.clear();
        self.first_error = None;
        self.response = None;

        loop {
            match self.state {
                State::Resolving => {
                    let host = self.url.host_str().unwrap_or_default();
                    self.addrs = match lookup_with_fallback(&self.resolvers, host).await {
                        Ok(addrs) => addrs,
                        Err(e) => {
                            self.state = State::Failed;
                            return Err(e);
                        }
                    };
                    match select_first(self.addrs.len(), &mut self.rng) {
                        Some(index) => self.state = State::Attempt(index),
                        None => {
                            self.state = State::Failed;
                            return Err(NetError::CannotResolveHostname {
                                host: host.to_string(),
                            });
                        }
                    }
                }
                State::Attempt(index) => {
                    let addr = self.addrs[index];
                    self.tried.push(addr);
                    let attempt = self.tried.len();
                    tracing::debug!(url = %self.url, %addr, attempt, "sending request");

                    match self.do_attempt(addr).await {
                        Ok(resp) => {
                            self.response = Some((resp, addr));
                            self.state = State::Done;
                        }
                        Err(e) => {
                            tracing::warn!(url = %self.url, %addr, attempt, error = %e, "attempt failed");
                            let retry = should_retry(&e, attempt, self.addrs.len())
                                .then(|| select_alternate(self.addrs.len(), index, &mut self.rng))
                                .flatten();
                            if let Some(next) = retry {
                                self.first_error = Some(e);
                                self.state = State::Attempt(next);
                                continue;
                            }

                            self.state = State::Failed;
                            return Err(match self.first_error.take() {
                                Some(first) => NetError::AllAttemptsFailed {
                                    first: Box::new(first),
                                    last: Box::new(e),
                                },
                                None => e,
                            });
                        }
                    }
                }
                State::Done => return Ok(()),
                State::Failed => return Err(NetError::ConnectionClosed),
            }
        }
    }

    async fn do_attempt(&self, addr: IpAddr) -> Result<Response<Incoming>, NetError> {
        let timeout = self.timeout;
        with_deadline(timeout, self.send_pinned(addr), || NetError::RequestTimedOut {
            timeout,
        })
        .await
    }

    /// Sends the request over a connection pinned to `addr`. When a reused
    /// pooled connection turns out to be closed before the request was
    /// written, it is sent once more on a fresh connection to the same
    /// address. A request that reached the wire is never sent again here.
    async fn send_pinned(&self, addr: IpAddr) -> Result<Response<Incoming>, NetError> {
        let host = self.url.host_str().unwrap_or_default();
        let route = DialRoute::new(host, addr);

        let mut stream = self.factory.create_stream(&self.url, Some(&route)).await?;
        let resp = match stream.try_send_request(self.build_request()?).await {
            Ok(resp) => resp,
            Err(SendFailure {
                error,
                unsent: Some(req),
            }) if stream.is_reused() => {
                tracing::debug!(%addr, error = %error, "idle connection closed before sending, retrying on a fresh one");
                stream = self.factory.create_fresh_stream(&self.url, Some(&route)).await?;
                stream.send_request(req).await?
            }
            Err(failure) => return Err(failure.error),
        };

        self.factory.release_stream(stream);
        Ok(resp)
    }

    fn build_request(&self) -> Result<Request<Full<Bytes>>, NetError> {
        let path = &self.url[Position::BeforePath..Position::AfterQuery];
        let authority = &self.url[Position::BeforeHost..Position::AfterPort];
        Request::post(if path.is_empty() { "/" } else { path })
            .header(HOST, authority)
            .header(CONTENT_TYPE, self.content_type.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(Full::new(self.body.clone()))
            .map_err(|e| NetError::Http {
                reason: e.to_string(),
            })
    }

    /// Addresses attempted so far, in order.
    pub fn tried_addresses(&self) -> &[IpAddr] {
        &self.tried
    }

    /// Take ownership of the response, converting to HttpResponse.
    /// Can only be called once - subsequent calls return None.
    pub fn take_response(&mut self) -> Option<HttpResponse> {
        self.response
            .take()
            .map(|(resp, addr)| HttpResponse::from_hyper(resp).with_remote_ip(addr))
    }
}
