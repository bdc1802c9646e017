//! # failnet
//!
//! An HTTP/1.1 client that resolves hostnames itself and fails over between
//! the resolved addresses.
//!
//! Each request is pinned to one address chosen uniformly at random from
//! the resolved set. If that attempt fails with a transport error and the
//! host has other addresses, the request is sent once more to a different
//! one.
//!
//! ## Features
//!
//! - **Two resolvers**: a main resolver (by default the servers of
//!   `/etc/resolv.conf`) and a fallback consulted only when main yields
//!   nothing (by default `8.8.8.8`)
//! - **Bounded-wait lookups**: resolution raced against a timer, with the
//!   abandoned lookup cancelled
//! - **Pinned attempts**: routing is scoped to one attempt, so concurrent
//!   requests on one client never interfere
//! - **Transport**: BoringSSL, TCP keepalive, per-phase timeouts and an idle
//!   connection pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use failnet::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), failnet::NetError> {
//!     let client = Client::new();
//!     let response = client
//!         .failover_post("https://example.com/api", "application/json", "{}")
//!         .await?;
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and context helpers
//! - [`dns`] - Resolvers and lookup capabilities
//! - [`socket`] - Connect jobs, TLS and the idle pool
//! - [`http`] - Transport, failover transaction and responses

pub mod base;
pub mod client;
pub mod dns;
pub mod http;
pub mod socket;

pub use base::neterror::{NetError, ResolverRole};
pub use client::{Client, ClientBuilder, DEFAULT_CONNECTION_TIMEOUT};
pub use dns::{Resolve, ResolveFn, Resolver, ResolverPair, StaticResolve};
pub use http::HttpResponse;
pub use socket::connectjob::{
    DialRoute, KeepaliveConfig, TransportConfig, DEFAULT_DIAL_TIMEOUT, DEFAULT_IDLE_CONN_TIMEOUT,
    DEFAULT_TLS_HANDSHAKE_TIMEOUT,
};
pub use socket::tls::TlsConfig;
