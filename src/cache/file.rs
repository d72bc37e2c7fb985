//! Disk-backed cache storage.
//!
//! Layout under the storage root:
//!
//! ```text
//! index.json                 store names in creation order
//! <sha256(name)>/entries.json
//! <sha256(name)>/<sha256(key)>-<generation>.bin
//! ```
//!
//! Body files carry the generation that wrote them, and `entries.json` is
//! replaced by rename, so a reader sees either the old or the new population.

use super::backend::{reject_duplicates, reject_non_get, CacheStorage, CacheStore};
use super::key::{digest, RequestKey};
use crate::types::{Request, Response};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

const INDEX_FILE: &str = "index.json";
const ENTRIES_FILE: &str = "entries.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageIndex {
    caches: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreManifest {
    name: String,
    generation: u64,
    entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryRecord {
    key: RequestKey,
    url: Url,
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
    body: String,
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

pub struct FileCacheStore {
    name: String,
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCacheStore {
    fn new(name: &str, dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            dir,
            write_lock: Mutex::new(()),
        }
    }

    async fn manifest(&self) -> Result<StoreManifest> {
        let mut manifest: StoreManifest = read_json(&self.dir.join(ENTRIES_FILE)).await?;
        if manifest.name.is_empty() {
            manifest.name = self.name.clone();
        }
        Ok(manifest)
    }

    async fn load_entry(&self, record: &EntryRecord) -> Result<Response> {
        let body = fs::read(self.dir.join(&record.body)).await.map_err(|e| {
            Error::storage_with_context(
                format!("cached body is unreadable: {}", e),
                ErrorContext::new()
                    .with_field_path(record.key.to_string())
                    .with_source("file_storage"),
            )
        })?;
        Ok(Response {
            url: record.url.clone(),
            status: record.status,
            status_text: record.status_text.clone(),
            headers: record.headers.clone(),
            body: body.into(),
        })
    }

    async fn commit(&self, batch: Vec<(RequestKey, Response)>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let mut manifest = self.manifest().await?;
        let generation = manifest.generation + 1;

        let mut replaced = Vec::new();
        for (key, response) in batch {
            let body = format!("{}-{}.bin", key.digest(), generation);
            fs::write(self.dir.join(&body), &response.body).await?;
            let record = EntryRecord {
                key: key.clone(),
                url: response.url,
                status: response.status,
                status_text: response.status_text,
                headers: response.headers,
                body,
            };
            match manifest.entries.iter_mut().find(|e| e.key == key) {
                Some(slot) => replaced.push(std::mem::replace(slot, record).body),
                None => manifest.entries.push(record),
            }
        }
        manifest.generation = generation;
        write_json_atomic(&self.dir.join(ENTRIES_FILE), &manifest).await?;

        // A body still referenced by the manifest is live.
        replaced.retain(|stale| !manifest.entries.iter().any(|e| e.body == *stale));
        for stale in replaced {
            if let Err(e) = fs::remove_file(self.dir.join(&stale)).await {
                warn!(
                    cache = %self.name,
                    file = %stale,
                    error = %e,
                    "failed to remove stale body"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        if !request.is_get() {
            return Ok(None);
        }
        let key = request.key();
        let manifest = self.manifest().await?;
        match manifest.entries.iter().find(|e| e.key == key) {
            Some(record) => Ok(Some(self.load_entry(record).await?)),
            None => Ok(None),
        }
    }

    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        reject_non_get(request, "file_storage")?;
        self.commit(vec![(request.key(), response)]).await
    }

    async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<()> {
        for (request, _) in &entries {
            reject_non_get(request, "file_storage")?;
        }
        reject_duplicates(entries.iter().map(|(r, _)| r), "file_storage")?;
        let batch = entries
            .into_iter()
            .map(|(request, response)| (request.key(), response))
            .collect();
        self.commit(batch).await
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        Ok(self
            .manifest()
            .await?
            .entries
            .into_iter()
            .map(|e| e.key)
            .collect())
    }
}

/// Cache storage persisted under a root directory, so stores survive restarts.
pub struct FileCacheStorage {
    root: PathBuf,
    stores: Mutex<HashMap<String, Arc<FileCacheStore>>>,
}

impl FileCacheStorage {
    /// Open (or create) a storage root.
    pub async fn open_root(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened file cache storage");
        Ok(Self {
            root,
            stores: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name))
    }

    async fn index(&self) -> Result<StorageIndex> {
        read_json(&self.root.join(INDEX_FILE)).await
    }

    fn handle(
        &self,
        stores: &mut HashMap<String, Arc<FileCacheStore>>,
        name: &str,
    ) -> Arc<FileCacheStore> {
        stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(FileCacheStore::new(name, self.store_dir(name))))
            .clone()
    }
}

#[async_trait]
impl CacheStorage for FileCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        if name.is_empty() {
            return Err(Error::storage_with_context(
                "cache name must not be empty",
                ErrorContext::new().with_source("file_storage"),
            ));
        }
        let mut stores = self.stores.lock().await;
        let mut index = self.index().await?;
        if !index.caches.iter().any(|c| c == name) {
            fs::create_dir_all(self.store_dir(name)).await?;
            index.caches.push(name.to_string());
            write_json_atomic(&self.root.join(INDEX_FILE), &index).await?;
            debug!(cache = %name, "created cache store");
        }
        Ok(self.handle(&mut stores, name))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.index().await?.caches.iter().any(|c| c == name))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.index().await?.caches)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut stores = self.stores.lock().await;
        let mut index = self.index().await?;
        let before = index.caches.len();
        index.caches.retain(|c| c != name);
        if index.caches.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.root.join(INDEX_FILE), &index).await?;
        stores.remove(name);
        match fs::remove_dir_all(self.store_dir(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        let names = self.index().await?.caches;
        for name in names {
            let store = {
                let mut stores = self.stores.lock().await;
                self.handle(&mut stores, &name)
            };
            if let Some(hit) = store.match_request(request).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
