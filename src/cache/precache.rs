//! Bulk fetch-and-store.

use super::backend::{reject_duplicates, CacheStore};
use crate::transport::Fetcher;
use crate::types::Request;
use crate::{Error, Result};
use futures::future::try_join_all;
use tracing::{debug, warn};

/// Fetch every request concurrently and store the results in one batch.
///
/// Fails fast: the first transport error or non-OK response aborts the whole
/// operation and nothing is written to `store`. A list naming the same
/// request identity twice is rejected before anything is fetched. Returns the
/// number of stored entries.
pub async fn add_all(
    store: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    requests: &[Request],
) -> Result<usize> {
    reject_duplicates(requests, "add_all")?;
    let fetches = requests.iter().map(|request| async move {
        let response = fetcher.fetch(request).await.map_err(|e| {
            warn!(url = %request.url(), error = %e, "precache fetch failed");
            e
        })?;
        if !response.ok() {
            warn!(
                url = %request.url(),
                status = response.status,
                "precache fetch returned non-OK status"
            );
            return Err(Error::Fetch {
                url: request.url().to_string(),
                status: response.status,
            });
        }
        debug!(url = %request.url(), bytes = response.body.len(), "precache fetched");
        Ok::<_, Error>((request.clone(), response))
    });

    let entries = try_join_all(fetches).await?;
    let count = entries.len();
    store.put_all(entries).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStorage, MemoryCacheStorage};
    use crate::transport::TransportError;
    use crate::types::Response;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticFetcher(HashMap<String, u16>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response> {
            match self.0.get(request.url().as_str()) {
                Some(status) => Ok(Response::new(request.url().clone(), *status, "asset")),
                None => Err(TransportError::Other("unreachable".into()).into()),
            }
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn requests(urls: &[&str]) -> Vec<Request> {
        urls.iter().map(|u| Request::get_str(u).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_all_assets_stored() {
        let fetcher = StaticFetcher(HashMap::from([
            ("http://localhost/static/a.css".to_string(), 200),
            ("https://cdn.tailwindcss.com/".to_string(), 200),
        ]));
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let reqs = requests(&[
            "http://localhost/static/a.css",
            "https://cdn.tailwindcss.com",
        ]);

        let stored = add_all(store.as_ref(), &fetcher, &reqs).await.unwrap();
        assert_eq!(stored, 2);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_non_ok_status_stores_nothing() {
        let fetcher = StaticFetcher(HashMap::from([
            ("http://localhost/static/a.css".to_string(), 200),
            ("http://localhost/static/missing.png".to_string(), 404),
        ]));
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let reqs = requests(&[
            "http://localhost/static/a.css",
            "http://localhost/static/missing.png",
        ]);

        let err = add_all(store.as_ref(), &fetcher, &reqs).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { status: 404, .. }));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_asset_stores_nothing() {
        let fetcher = StaticFetcher(HashMap::from([(
            "http://localhost/static/a.css".to_string(),
            200,
        )]));
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let reqs = requests(&[
            "http://localhost/static/a.css",
            "https://unpkg.com/htmx.org@1.9.6",
        ]);

        let err = add_all(store.as_ref(), &fetcher, &reqs).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_rejected_before_fetching() {
        let fetcher = StaticFetcher(HashMap::from([(
            "http://localhost/static/a.css".to_string(),
            200,
        )]));
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let reqs = requests(&[
            "http://localhost/static/a.css",
            "http://localhost/static/a.css#top",
        ]);

        let err = add_all(store.as_ref(), &fetcher, &reqs).await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
        assert!(!err.is_network());
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
