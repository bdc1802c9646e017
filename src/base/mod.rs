//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): every failure the client can report,
//!   with Chromium-style numeric codes
//! - [`context`]: helpers that attach host/port/deadline context to errors

pub mod context;
pub mod neterror;

#[cfg(test)]
mod tests;
