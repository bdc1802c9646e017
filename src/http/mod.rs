//! HTTP/1.1 request path: transport, failover transaction, responses.

pub mod failover;
pub mod response;
pub mod responsebody;
pub mod retry;
pub mod streamfactory;

// Re-exports for convenience
pub use failover::FailoverTransaction;
pub use response::HttpResponse;
pub use responsebody::ResponseBody;
