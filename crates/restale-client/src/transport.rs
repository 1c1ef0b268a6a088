//! Wire-level transport boundary
//!
//! The actual HTTP mechanics (connection pooling, TLS, request encoding,
//! content decoding) live behind the [`Transport`] trait. The bundled
//! implementation delegates to reqwest; gzip/brotli/deflate decoding is
//! handled by reqwest itself before the body reaches the cache.

use crate::{error::Result, request::Request};
use async_trait::async_trait;
use restale_cache::{CachedResponse, Freshness};
use std::time::{Duration, SystemTime};

/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// The wire-level HTTP collaborator
///
/// Method-agnostic over GET/POST/PUT/DELETE/HEAD/OPTIONS and the custom
/// PURGE verb. A fetch captures the response's freshness metadata at
/// receive time.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and snapshot the response
    async fn fetch(&self, request: &Request) -> Result<CachedResponse>;
}

/// Reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: Option<String>,
}

impl ReqwestTransport {
    /// Create a transport with default timeouts
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            user_agent: None,
        })
    }

    /// Create a transport around an existing reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            user_agent: None,
        }
    }

    /// Set a custom user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url());

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.header("User-Agent", user_agent);
        }
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let captured_at = SystemTime::now();
        let status = response.status().as_u16();

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let age = response
            .headers()
            .get("age")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let cache_control = response
            .headers()
            .get("cache-control")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let freshness =
            Freshness::from_headers(age.as_deref(), cache_control.as_deref(), captured_at);

        let body = response.bytes().await?;

        Ok(CachedResponse::new(status, headers, body, freshness))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_construction() {
        let transport = ReqwestTransport::new().unwrap();
        assert!(transport.user_agent.is_none());

        let custom = ReqwestTransport::new()
            .unwrap()
            .with_user_agent("restale/0.1");
        assert_eq!(custom.user_agent.as_deref(), Some("restale/0.1"));
    }
}
