//! HTTP Client and related utilities

mod config;
mod http;
mod retry;

pub use config::{RetryConfig, RhinoConfig, DEFAULT_BASE_URL};
pub use http::HttpClient;
pub use retry::Backoff;
