//! Host APIs for `CopilotBar` fetch strategies.
//!
//! - [`http`] - HTTP client with tracing and domain allowlist

pub mod http;

pub use http::{HttpClient, ResponseExt};
