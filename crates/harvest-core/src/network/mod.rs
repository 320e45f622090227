//! Network utilities for HTTP operations and retries.

mod client;
mod retry;

pub use client::{error_message, extract_domain, HttpClient};
pub use retry::{retry_async, RetryConfig, RetryDecision, RetryStats};
