//! Shared HTTP plumbing for sources
//!
//! Each source owns one [`HttpFetcher`]: a reqwest client configured from its
//! `SourceConfig` plus the request retry policy.

use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use subrecon_core::config::SourceConfig;
use subrecon_core::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// HTTP client with cancellation-aware retries
///
/// Failed requests are retried up to `retry` attempts in total, sleeping
/// `n × 1s` after the n-th failure (`n × 2s` after HTTP 429). Authentication
/// failures are not retried.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    source: &'static str,
    client: Client,
    attempts: usize,
    backoff: Duration,
}

impl HttpFetcher {
    /// Build a fetcher for `source` from its configuration
    pub fn new(source: &'static str, config: &SourceConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::config(format!("invalid proxy for {}: {}", source, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            source,
            client,
            attempts: config.retry.max(1),
            backoff: BACKOFF_UNIT,
        })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send `request` with retries and return the response body
    pub async fn fetch(&self, request: RequestBuilder, cancel: &CancellationToken) -> Result<String> {
        let request = request
            .build()
            .map_err(|e| Error::source_error(self.source, format!("failed to create request: {}", e)))?;

        let mut last_error = String::new();

        for attempt in 0..self.attempts {
            let Some(attempt_request) = request.try_clone() else {
                return Err(Error::source_error(self.source, "request cannot be retried"));
            };

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                sent = self.client.execute(attempt_request) => sent,
            };

            let step = attempt as u32 + 1;
            let delay = match sent {
                Ok(response) if response.status().is_success() => {
                    return tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(Error::Cancelled),
                        body = response.text() => body.map_err(|e| {
                            Error::source_error(self.source, format!("failed to read response: {}", e))
                        }),
                    };
                }
                Ok(response) => match response.status() {
                    status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                        return Err(Error::source_error(
                            self.source,
                            format!("authentication failed, invalid API key (status {})", status),
                        ));
                    }
                    status @ StatusCode::TOO_MANY_REQUESTS => {
                        last_error = format!("rate limited (status {})", status);
                        self.backoff * 2 * step
                    }
                    status => {
                        last_error = format!("unexpected status code: {}", status);
                        self.backoff * step
                    }
                },
                Err(e) => {
                    last_error = format!("request failed: {}", e);
                    self.backoff * step
                }
            };

            if attempt + 1 < self.attempts {
                debug!(source = self.source, attempt, "{}, retrying in {:?}", last_error, delay);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(Error::source_error(
            self.source,
            format!("{} after {} attempts", last_error, self.attempts),
        ))
    }
}
