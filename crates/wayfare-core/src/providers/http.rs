//! Generic JSON-over-HTTP provider adapter.
//!
//! Sends `GET {base_url}?{params}` and returns the decoded JSON body. The
//! reqwest client is built once by the process entry point and injected here.

use super::adapter::ProviderAdapter;
use crate::cache::CacheParams;
use crate::config::NetworkConfig;
use crate::error::{Result, WayfareError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Build the shared HTTP client used by provider adapters.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(NetworkConfig::USER_AGENT)
        .build()
        .map_err(|e| WayfareError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(e),
        })
}

/// Provider adapter for a JSON HTTP endpoint.
pub struct HttpJsonProvider {
    endpoint: String,
    base_url: Url,
    client: Client,
    headers: HeaderMap,
}

impl HttpJsonProvider {
    pub fn new(endpoint: impl Into<String>, base_url: &str, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| WayfareError::Config {
            message: format!("Invalid provider URL '{}': {}", base_url, e),
        })?;

        Ok(Self {
            endpoint: endpoint.into(),
            base_url,
            client,
            headers: HeaderMap::new(),
        })
    }

    /// Add a header sent with every request (e.g. an API key).
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| WayfareError::Config {
            message: format!("Invalid header name '{}': {}", name, e),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| WayfareError::Config {
            message: format!("Invalid value for header '{}': {}", name, e),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// The request URL for a parameter set, keys in sorted order.
    pub fn request_url(&self, params: &CacheParams) -> Url {
        let mut url = self.base_url.clone();
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.iter() {
                query.append_pair(key, &value.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl ProviderAdapter for HttpJsonProvider {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, params: &CacheParams) -> Result<Value> {
        let url = self.request_url(params);
        debug!(endpoint = %self.endpoint, %url, "Calling provider");

        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WayfareError::Provider {
                endpoint: self.endpoint.clone(),
                status: Some(status.as_u16()),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| WayfareError::Provider {
                endpoint: self.endpoint.clone(),
                status: Some(status.as_u16()),
                message: format!("Response is not valid JSON: {}", e),
            })
    }
}
