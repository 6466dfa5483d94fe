//! Outbound HTTP: IP geolocation, chat completion and address lookup.
//!
//! Provider logic is written against [`HttpTransport`] so the fallback
//! chains can be exercised without a network.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod address;
pub mod ai;
pub mod geo;

pub use address::{lookup_address, AddressQuery, AddressSource, RealAddress};
pub use ai::{AiError, ChatMessage, ChatRequest, ChatResponse};
pub use geo::{locate, GeoLookup, GeoSource};

const USER_AGENT: &str = concat!("geofill/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw response as seen by provider code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for NetError {
    /// Query strings carry API keys, so the URL is dropped from the error.
    fn from(err: reqwest::Error) -> Self {
        NetError::Request(err.without_url())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, NetError>;

    /// POST a JSON body with bearer authentication.
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &Value,
    ) -> Result<HttpResponse, NetError>;
}

/// Run `request` under `limit`, folding an elapsed timer into [`NetError::Timeout`].
pub async fn with_timeout<F>(limit: Duration, request: F) -> Result<HttpResponse, NetError>
where
    F: std::future::Future<Output = Result<HttpResponse, NetError>>,
{
    match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(NetError::Timeout(limit)),
    }
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    async fn collect(response: reqwest::Response) -> Result<HttpResponse, NetError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
        let response = self.client.get(url).send().await?;
        Self::collect(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &Value,
    ) -> Result<HttpResponse, NetError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;
        Self::collect(response).await
    }
}
