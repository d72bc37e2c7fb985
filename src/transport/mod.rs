//! Network side of the worker: the live `fetch` that cache misses and
//! pass-through requests go to.

mod http;

pub use http::HttpFetcher;

use crate::types::{Request, Response};
use crate::Result;
use async_trait::async_trait;

/// Performs a live network fetch.
///
/// Non-OK statuses are returned as responses; only a failure to obtain a
/// response at all is an error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
    fn name(&self) -> &'static str;
}

/// A fetcher with no network: every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        Err(TransportError::Offline(request.url().to_string()).into())
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network unavailable for {0}")]
    Offline(String),

    #[error("Transport error: {0}")]
    Other(String),
}
