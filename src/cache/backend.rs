//! Cache storage traits and the in-memory implementation.

use super::key::RequestKey;
use crate::types::{Request, Response};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A single named cache store: request identity -> response snapshot.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;

    /// Look up a request. Only GET requests can match.
    async fn match_request(&self, request: &Request) -> Result<Option<Response>>;

    async fn put(&self, request: &Request, response: Response) -> Result<()>;

    /// Store every entry or none of them.
    async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<()>;

    /// Keys in insertion order.
    async fn keys(&self) -> Result<Vec<RequestKey>>;

    async fn len(&self) -> Result<usize> {
        Ok(self.keys().await?.len())
    }
}

/// The collection of named cache stores available to a worker.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>>;

    async fn has(&self, name: &str) -> Result<bool>;

    /// Store names in creation order.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Delete a store. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Search every store in creation order and return the first hit.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>>;

    fn backend_name(&self) -> &'static str;
}

pub(crate) fn reject_non_get(request: &Request, source: &str) -> Result<()> {
    if request.is_get() {
        Ok(())
    } else {
        Err(Error::storage_with_context(
            "only GET requests can be cached",
            ErrorContext::new()
                .with_details(format!("{} {}", request.method(), request.url()))
                .with_source(source.to_string()),
        ))
    }
}

/// A batch may not name the same request identity twice.
pub(crate) fn reject_duplicates<'a, I>(requests: I, source: &str) -> Result<()>
where
    I: IntoIterator<Item = &'a Request>,
{
    let mut seen = HashSet::new();
    for request in requests {
        let key = request.key();
        if !seen.insert(key.clone()) {
            return Err(Error::storage_with_context(
                "duplicate request in batch",
                ErrorContext::new()
                    .with_details(key.to_string())
                    .with_source(source.to_string()),
            ));
        }
    }
    Ok(())
}

pub struct MemoryCacheStore {
    name: String,
    entries: RwLock<Vec<(RequestKey, Response)>>,
}

impl MemoryCacheStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(Vec::new()),
        }
    }

    fn upsert(entries: &mut Vec<(RequestKey, Response)>, key: RequestKey, response: Response) {
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = response;
        } else {
            entries.push((key, response));
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        if !request.is_get() {
            return Ok(None);
        }
        let key = request.key();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, r)| r.clone()))
    }

    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        reject_non_get(request, "memory_cache")?;
        let mut entries = self.entries.write().await;
        Self::upsert(&mut entries, request.key(), response);
        Ok(())
    }

    async fn put_all(&self, batch: Vec<(Request, Response)>) -> Result<()> {
        for (request, _) in &batch {
            reject_non_get(request, "memory_cache")?;
        }
        reject_duplicates(batch.iter().map(|(r, _)| r), "memory_cache")?;
        let mut entries = self.entries.write().await;
        for (request, response) in batch {
            Self::upsert(&mut entries, request.key(), response);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// In-process cache storage. Used by tests and by embedders that do not
/// need persistence across restarts.
#[derive(Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<Vec<Arc<MemoryCacheStore>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        let mut stores = self.stores.write().await;
        if let Some(existing) = stores.iter().find(|s| s.name == name) {
            return Ok(existing.clone());
        }
        let store = Arc::new(MemoryCacheStore::new(name));
        stores.push(store.clone());
        Ok(store)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.stores.read().await.iter().any(|s| s.name == name))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .stores
            .read()
            .await
            .iter()
            .map(|s| s.name.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        let stores: Vec<Arc<MemoryCacheStore>> = self.stores.read().await.clone();
        for store in stores {
            if let Some(hit) = store.match_request(request).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn get(url: &str) -> Request {
        Request::get_str(url).unwrap()
    }

    fn resp(req: &Request, body: &'static str) -> Response {
        Response::new(req.url().clone(), 200, body)
    }

    #[tokio::test]
    async fn test_open_is_idempotent_and_ordered() {
        let storage = MemoryCacheStorage::new();
        storage.open("p2p-connect-v1").await.unwrap();
        storage.open("p2p-connect-v2").await.unwrap();
        storage.open("p2p-connect-v1").await.unwrap();
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["p2p-connect-v1".to_string(), "p2p-connect-v2".to_string()]
        );
        assert!(storage.has("p2p-connect-v2").await.unwrap());
        assert!(!storage.has("p2p-connect-v3").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let req = get("http://localhost:8000/static/a.css");
        store.put(&req, resp(&req, "body{}")).await.unwrap();

        let hit = store.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"body{}");

        let with_fragment = get("http://localhost:8000/static/a.css#x");
        assert!(store.match_request(&with_fragment).await.unwrap().is_some());

        let post = Request::parse(Method::POST, "http://localhost:8000/static/a.css").unwrap();
        assert!(store.match_request(&post).await.unwrap().is_none());
        assert!(store.put(&post, resp(&post, "")).await.is_err());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let req = get("http://localhost:8000/static/a.css");
        store.put(&req, resp(&req, "old")).await.unwrap();
        store.put(&req, resp(&req, "new")).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        let hit = store.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_put_all_rejects_whole_batch() {
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let ok = get("http://localhost:8000/static/a.css");
        let bad = Request::parse(Method::PUT, "http://localhost:8000/static/b.css").unwrap();
        let batch = vec![(ok.clone(), resp(&ok, "a")), (bad.clone(), resp(&bad, "b"))];
        assert!(store.put_all(batch).await.is_err());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_all_rejects_duplicate_identity() {
        let storage = MemoryCacheStorage::new();
        let store = storage.open("v1").await.unwrap();
        let a = get("http://localhost:8000/static/a.css");
        let a_fragment = get("http://localhost:8000/static/a.css#x");
        let batch = vec![
            (a.clone(), resp(&a, "1")),
            (a_fragment.clone(), resp(&a_fragment, "2")),
        ];

        let err = store.put_all(batch).await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_match_any_and_delete() {
        let storage = MemoryCacheStorage::new();
        let req = get("http://localhost:8000/static/a.css");
        let old = storage.open("v1").await.unwrap();
        old.put(&req, resp(&req, "from-v1")).await.unwrap();
        let new = storage.open("v2").await.unwrap();
        new.put(&req, resp(&req, "from-v2")).await.unwrap();

        let hit = storage.match_any(&req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"from-v1");

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        let hit = storage.match_any(&req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"from-v2");
    }
}
