//! HTTP fetches against the app origin

use async_trait::async_trait;
use bbtimer_host_api::{FetchMode, HostError, HostResult, Network, NetworkError, Request, Response};
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// Default timeout for a single fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Network capability backed by reqwest
pub struct HttpNetwork {
    client: Client,
    origin: String,
}

impl HttpNetwork {
    /// `origin` is prefixed to absolute-path request URLs, e.g. `http://localhost:8080`
    pub fn new(origin: impl Into<String>, timeout: Duration) -> HostResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HostError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Full URL for a request URL that may be an absolute path
    pub fn absolute_url(&self, url: &str) -> Result<String, NetworkError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(url.to_string())
        } else if url.starts_with('/') {
            Ok(format!("{}{}", self.origin, url))
        } else {
            Err(NetworkError::InvalidUrl(url.to_string()))
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request, mode: FetchMode) -> Result<Response, NetworkError> {
        let url = self.absolute_url(&request.url)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::InvalidUrl(format!("{} {}", request.method, request.url)))?;

        let mut builder = self.client.request(method, &url);
        if mode == FetchMode::NoStore {
            builder = builder.header(CACHE_CONTROL, "no-store");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Unavailable(e.to_string()))?;

        debug!(url = %url, status, bytes = body.len(), "Fetched");

        Ok(Response {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
