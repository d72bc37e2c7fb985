use super::{Fetcher, TransportError};
use crate::types::{Request, Response};
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::debug;

/// Live network fetcher backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("OFFLINE_CACHE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(
                env::var("OFFLINE_CACHE_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("OFFLINE_CACHE_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let mut req = self
            .client
            .request(request.method().clone(), request.url().clone());
        for (name, value) in request.headers() {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await.map_err(TransportError::Http)?;
        let url = resp.url().clone();
        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = resp.bytes().await.map_err(TransportError::Http)?;

        debug!(%url, status = status.as_u16(), bytes = body.len(), "network fetch");

        Ok(Response {
            url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
