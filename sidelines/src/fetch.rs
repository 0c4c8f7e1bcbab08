use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use common::FetchConfig;

use crate::error::FeedError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = "Sidelines/0.1.0";

/// Performs the single HTTP GET each feed gets per aggregation pass.
///
/// The client is built once and shared; there is no retry or backoff.
#[derive(Clone)]
pub struct FeedFetcher {
    client: Client,
    timeout: Duration,
    max_response_bytes: u64,
}

impl FeedFetcher {
    pub fn new(timeout_secs: u64, connect_timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent(user_agent)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }

    pub fn from_config(config: Option<&FetchConfig>) -> Result<Self> {
        let timeout = config
            .and_then(|c| c.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let connect_timeout = config
            .and_then(|c| c.connect_timeout_seconds)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        let user_agent = config
            .and_then(|c| c.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT);

        let mut fetcher = Self::new(timeout, connect_timeout, user_agent)?;
        if let Some(limit) = config.and_then(|c| c.max_response_bytes) {
            fetcher.max_response_bytes = limit;
        }
        Ok(fetcher)
    }

    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Fetch the raw feed body. The whole attempt, body included, is bounded by the timeout.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        match tokio::time::timeout(self.timeout, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    async fn fetch_inner(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status,
            });
        }

        if response
            .content_length()
            .map_or(false, |len| len > self.max_response_bytes)
        {
            return Err(FeedError::TooLarge {
                url: url.to_string(),
                limit: self.max_response_bytes,
            });
        }

        let mut body = Vec::new();
        // Content-Length is often missing on chunked feed responses.
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| network_error(url, e, self.timeout))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_response_bytes {
                return Err(FeedError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn network_error(url: &str, e: reqwest::Error, timeout: Duration) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        FeedError::Network {
            url: url.to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rss")
            .with_status(200)
            .with_body("<rss/>")
            .create_async()
            .await;

        let fetcher = FeedFetcher::new(5, 5, DEFAULT_USER_AGENT).unwrap();
        let body = fetcher.fetch(&format!("{}/rss", server.url())).await.unwrap();
        assert_eq!(body, b"<rss/>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_single_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rss")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let fetcher = FeedFetcher::new(5, 5, DEFAULT_USER_AGENT).unwrap();
        let err = fetcher.fetch(&format!("{}/rss", server.url())).await.unwrap_err();
        assert_eq!(err.kind(), "status");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big")
            .with_status(200)
            .with_body("x".repeat(2048))
            .create_async()
            .await;

        let fetcher = FeedFetcher::new(5, 5, DEFAULT_USER_AGENT)
            .unwrap()
            .with_max_response_bytes(1024);
        let err = fetcher.fetch(&format!("{}/big", server.url())).await.unwrap_err();
        assert_eq!(err.kind(), "too_large");
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = FeedFetcher::new(2, 2, DEFAULT_USER_AGENT).unwrap();
        let err = fetcher.fetch(&format!("http://{}/rss", addr)).await.unwrap_err();
        assert!(matches!(err.kind(), "network" | "timeout"));
    }
}
