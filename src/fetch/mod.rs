//! HTTP transport: client pool and single-request fetch

mod http;
mod pool;

pub use http::fetch;
pub use pool::ClientPool;
