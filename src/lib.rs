//! # offline-asset-cache
//!
//! 离线静态资源缓存管理器：安装时预取固定资源清单，之后优先从本地缓存提供，激活时清理旧版本缓存。
//!
//! Cache-first offline asset manager. A worker pre-fetches a fixed list of
//! static assets into a versioned cache store on install, serves eligible
//! requests from that store afterwards, and evicts stores from earlier
//! versions on activation.
//!
//! ## Lifecycle
//!
//! - **install**: open the store named after the current version and fetch
//!   every asset in one all-or-nothing batch.
//! - **activate**: delete every store whose name is not the current version.
//! - **fetch**: non-GET requests and dynamic paths (`/`, `/chat/`, `/ws/`,
//!   `/auth/`) go to the network; everything else is looked up in the cache
//!   first and falls back to the network on a miss without filling the cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use offline_asset_cache::cache::FileCacheStorage;
//! use offline_asset_cache::config::WorkerConfig;
//! use offline_asset_cache::transport::HttpFetcher;
//! use offline_asset_cache::types::Request;
//! use offline_asset_cache::ServiceWorker;
//!
//! #[tokio::main]
//! async fn main() -> offline_asset_cache::Result<()> {
//!     let storage = Arc::new(FileCacheStorage::open_root(".offline-cache").await?);
//!     let mut worker = ServiceWorker::new(
//!         WorkerConfig::default().with_env_overrides()?,
//!         storage,
//!         Arc::new(HttpFetcher::new()?),
//!     );
//!     worker.start().await?;
//!
//!     let req = Request::get_str("http://localhost:8000/static/manifest.json")?;
//!     let outcome = worker.handle_fetch(&req).await?;
//!     println!("{:?} {}", outcome.source, outcome.response.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Cache storage traits, memory and file backends, bulk precache |
//! | [`config`] | Version name, origin, asset list and bypass rules |
//! | [`transport`] | Live network fetcher |
//! | [`types`] | Request and response snapshot types |
//! | [`worker`] | Lifecycle state machine and fetch handler |

pub mod cache;
pub mod config;
pub mod transport;
pub mod types;
pub mod worker;

pub use config::WorkerConfig;
pub use types::{Request, Response};
pub use worker::{FetchOutcome, FetchRoute, ResponseSource, ServiceWorker, WorkerState};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
