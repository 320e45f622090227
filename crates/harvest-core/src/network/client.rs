//! HTTP client for the Harvest APIs.
//!
//! Provides a wrapper around reqwest with:
//! - Configurable timeouts and the tool's user agent
//! - Rate-limit detection (HTTP 429 with `Retry-After`)
//! - Bounded retries for rate-limited requests only

use crate::config::{ApiConfig, NetworkConfig};
use crate::network::retry::{retry_async, RetryConfig, RetryDecision};
use crate::{MigrateError, Result};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// HTTP client shared by the Harvest and OAuth clients.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a new HTTP client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(ApiConfig::USER_AGENT)
            .build()
            .map_err(|e| MigrateError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            timeout,
            retry: RetryConfig::default(),
        })
    }

    /// Per-request timeout this client was built with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the retry configuration used for rate-limited requests.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get a reference to the underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Build and send a request, retrying while Harvest rate-limits us.
    ///
    /// `build` is called once per attempt. Non-success statuses other than
    /// 429 are returned to the caller, which decides what they mean.
    pub async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let build = &build;
        let client = &self.client;
        let timeout = self.timeout;

        let (result, stats) = retry_async(
            &self.retry,
            || async move {
                let request = build(client).build()?;
                let method = request.method().clone();
                let url = request.url().to_string();
                debug!("{} {}", method, url);

                let response = client.execute(request).await.map_err(|e| {
                    if e.is_timeout() {
                        MigrateError::Timeout(timeout)
                    } else {
                        MigrateError::Network {
                            message: format!("{} {} failed: {}", method, url, e),
                            cause: Some(e.to_string()),
                        }
                    }
                })?;

                check_rate_limit(response, &url)
            },
            |e: &MigrateError| match e {
                MigrateError::RateLimited {
                    retry_after_secs, ..
                } => RetryDecision::Retry(retry_after_secs.map(Duration::from_secs)),
                _ => RetryDecision::Stop,
            },
        )
        .await;

        if stats.attempts > 1 {
            debug!(
                "Request finished after {} attempts ({:?} waiting)",
                stats.attempts, stats.total_delay
            );
        }
        result
    }
}

fn check_rate_limit(response: Response, url: &str) -> Result<Response> {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());

    Err(MigrateError::RateLimited {
        service: extract_domain(url),
        retry_after_secs: retry_after,
    })
}

/// Extract domain from a URL.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Pull a human-readable message out of a Harvest error body.
///
/// Harvest answers validation failures with `{"message": "..."}` and OAuth
/// failures with `{"error": "...", "error_description": "..."}`.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error_description"))
            .or_else(|| v.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    match from_json {
        Some(message) => format!("{} ({})", message, status),
        None if body.trim().is_empty() => status.to_string(),
        None => format!("{}: {}", status, body.trim()),
    }
}
