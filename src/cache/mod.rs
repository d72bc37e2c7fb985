//! 缓存存储模块：按版本命名的请求到响应快照映射，提供内存与磁盘两种后端。
//!
//! # Cache Storage Module
//!
//! Named, versioned cache stores that map a request identity to a response
//! snapshot, grouped under a [`CacheStorage`] that can enumerate, open and
//! delete stores by name.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStorage`] | Collection of named stores (open / keys / delete / match_any) |
//! | [`CacheStore`] | A single store: match / put / atomic put_all |
//! | [`MemoryCacheStorage`] | In-process storage, the substitute used in tests |
//! | [`FileCacheStorage`] | Disk-backed storage that survives restarts |
//! | [`RequestKey`] | Request identity (absolute URL without fragment) |
//! | [`add_all`] | Fail-fast bulk fetch-and-store |
//!
//! ## Example
//!
//! ```rust
//! use offline_asset_cache::cache::{CacheStorage, MemoryCacheStorage};
//! use offline_asset_cache::types::{Request, Response};
//!
//! # tokio_test::block_on(async {
//! let storage = MemoryCacheStorage::new();
//! let store = storage.open("p2p-connect-v2").await.unwrap();
//! let req = Request::get_str("http://localhost:8000/static/manifest.json").unwrap();
//! store.put(&req, Response::new(req.url().clone(), 200, "{}")).await.unwrap();
//! assert!(storage.match_any(&req).await.unwrap().is_some());
//! # });
//! ```

mod backend;
mod file;
mod key;
mod precache;

pub use backend::{CacheStorage, CacheStore, MemoryCacheStorage, MemoryCacheStore};
pub use file::{FileCacheStorage, FileCacheStore};
pub use key::{digest, RequestKey};
pub use precache::add_all;
