//! Socket and connection management.
//!
//! Mirrors the shape of Chromium's `net/socket/`:
//! - [`connectjob`]: route/DNS → TCP → keepalive → TLS connection flow
//! - [`pool`]: idle HTTP/1.1 connections keyed by pinned address
//! - [`tls`]: TLS configuration with BoringSSL

pub mod client;
pub mod connectjob;
pub mod pool;
pub mod tls;
