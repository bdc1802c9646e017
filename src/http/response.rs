//! HTTP Response with body access.

use crate::base::neterror::NetError;
use crate::http::ResponseBody;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use hyper::body::Incoming;
use std::net::IpAddr;

/// HTTP Response with accessible body.
/// This is the user-facing response type that owns the body.
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    remote_ip: Option<IpAddr>,
    body: Option<ResponseBody>,
}

impl HttpResponse {
    /// Create from hyper Response<Incoming>.
    pub fn from_hyper(resp: http::Response<Incoming>) -> Self {
        let (parts, body) = resp.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            remote_ip: None,
            body: Some(ResponseBody::new(body)),
        }
    }

    pub(crate) fn with_remote_ip(mut self, ip: IpAddr) -> Self {
        self.remote_ip = Some(ip);
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The address the answering connection was pinned to.
    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_ip
    }

    /// Take the response body for consumption.
    /// Can only be called once - subsequent calls return None.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// Convenience method to consume body as bytes.
    pub async fn bytes(mut self) -> Result<Bytes, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.bytes().await
    }

    /// Convenience method to consume body as text.
    pub async fn text(mut self) -> Result<String, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.text().await
    }

    /// Convenience method to consume body as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(mut self) -> Result<T, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.json().await
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("remote_ip", &self.remote_ip)
            .finish_non_exhaustive()
    }
}
