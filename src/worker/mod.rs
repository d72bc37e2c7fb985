//! 生命周期模块：以显式状态机处理 install / activate / fetch 三种生命周期信号。
//!
//! # Lifecycle Handler
//!
//! [`ServiceWorker`] owns the current [`WorkerConfig`] plus injected handles
//! to the cache storage and the network, and moves through
//! [`WorkerState`] via named transitions:
//!
//! | Transition | From | To | Effect |
//! |------------|------|----|--------|
//! | [`ServiceWorker::install`] | Installing | Waiting / Redundant | open store, precache every asset or nothing |
//! | [`ServiceWorker::activate`] | Waiting | Active | delete every store not named like the current version |
//! | [`ServiceWorker::handle_fetch`] | any | - | route the request, serve cache-first when eligible |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use offline_asset_cache::cache::MemoryCacheStorage;
//! use offline_asset_cache::config::WorkerConfig;
//! use offline_asset_cache::transport::OfflineFetcher;
//! use offline_asset_cache::worker::{ServiceWorker, WorkerState};
//!
//! let worker = ServiceWorker::new(
//!     WorkerConfig::default(),
//!     Arc::new(MemoryCacheStorage::new()),
//!     Arc::new(OfflineFetcher),
//! );
//! assert_eq!(worker.state(), WorkerState::Installing);
//! ```

mod route;
mod state;
mod stats;

pub use route::{route, FetchRoute, PassthroughReason, ResponseSource};
pub use state::{ActivateOutcome, InstallOutcome, WorkerState};
pub use stats::FetchStats;

use crate::cache::{add_all, CacheStorage};
use crate::config::WorkerConfig;
use crate::transport::Fetcher;
use crate::types::{Request, Response};
use crate::{Error, Result};
use stats::AtomicStats;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Response returned by the fetch handler, tagged with how it was obtained.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
    pub route: FetchRoute,
}

pub struct ServiceWorker {
    config: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: WorkerState,
    stats: AtomicStats,
}

impl ServiceWorker {
    /// A freshly registered worker, about to install.
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            fetcher,
            state: WorkerState::Installing,
            stats: AtomicStats::default(),
        }
    }

    /// Rebuild a worker from persisted cache state after a restart.
    ///
    /// - current store absent or missing assets: `Installing`
    /// - current store complete next to other versions: `Waiting`
    /// - current store complete and the only one: `Active`
    pub async fn restore(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let names = storage.keys().await?;
        let mut worker = Self::new(config, storage, fetcher);
        worker.state = if !worker.is_installed(&names).await? {
            WorkerState::Installing
        } else if names.len() > 1 {
            WorkerState::Waiting
        } else {
            WorkerState::Active
        };
        debug!(
            cache = %worker.config.cache_name,
            state = %worker.state,
            stores = names.len(),
            "restored worker"
        );
        Ok(worker)
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn stats(&self) -> FetchStats {
        self.stats.to_stats()
    }

    fn expect_state(&self, expected: WorkerState, attempted: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::Lifecycle {
                state: self.state,
                attempted,
            })
        }
    }

    /// Install: open the current store and precache the asset list.
    ///
    /// Any failing asset fails the whole install; nothing is stored and the
    /// worker becomes `Redundant`. A store created by the failed install is
    /// removed again, so a restart never mistakes it for an installed version.
    /// Stores from earlier versions are untouched.
    pub async fn install(&mut self) -> Result<InstallOutcome> {
        self.expect_state(WorkerState::Installing, "install")?;
        let cache_name = self.config.cache_name.clone();
        info!(cache = %cache_name, assets = self.config.assets.len(), "installing");

        let existed = self.storage.has(&cache_name).await?;
        match self.precache().await {
            Ok(cached) => {
                self.state = WorkerState::Waiting;
                info!(cache = %cache_name, cached, "install complete");
                Ok(InstallOutcome {
                    cache_name,
                    cached,
                    skip_waiting: self.config.skip_waiting,
                })
            }
            Err(e) => {
                self.state = WorkerState::Redundant;
                warn!(cache = %cache_name, error = %e, "install failed; worker is redundant");
                if !existed {
                    if let Err(cleanup) = self.storage.delete(&cache_name).await {
                        warn!(
                            cache = %cache_name,
                            error = %cleanup,
                            "failed to remove partial cache"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        let requests = self.config.asset_requests()?;
        let store = self.storage.open(&self.config.cache_name).await?;
        add_all(store.as_ref(), self.fetcher.as_ref(), &requests).await
    }

    /// Every asset of the current version is present in its store.
    async fn is_installed(&self, names: &[String]) -> Result<bool> {
        if !names.iter().any(|n| *n == self.config.cache_name) {
            return Ok(false);
        }
        let store = self.storage.open(&self.config.cache_name).await?;
        let keys = store.keys().await?;
        Ok(self
            .config
            .asset_requests()?
            .iter()
            .all(|r| keys.contains(&r.key())))
    }

    /// Activate: delete every store whose name is not the current version.
    pub async fn activate(&mut self) -> Result<ActivateOutcome> {
        self.expect_state(WorkerState::Waiting, "activate")?;
        let cache_name = self.config.cache_name.clone();

        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name != cache_name && self.storage.delete(&name).await? {
                debug!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }

        self.state = WorkerState::Active;
        info!(cache = %cache_name, deleted = deleted.len(), "activated");
        Ok(ActivateOutcome {
            cache_name,
            deleted,
        })
    }

    /// Install, then activate straight away when the install asked to skip
    /// waiting. Otherwise the worker stays `Waiting` until `activate` is called.
    pub async fn start(&mut self) -> Result<(InstallOutcome, Option<ActivateOutcome>)> {
        let installed = self.install().await?;
        let activated = if installed.skip_waiting {
            Some(self.activate().await?)
        } else {
            None
        };
        Ok((installed, activated))
    }

    /// Routing decision for a request, without any I/O.
    pub fn route(&self, request: &Request) -> FetchRoute {
        route(self.state, &self.config.bypass, request)
    }

    /// Handle an intercepted request.
    ///
    /// Cache misses are answered from the network and are not stored.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
        let route = self.route(request);
        match route {
            FetchRoute::Passthrough(reason) => {
                AtomicStats::bump(&self.stats.passthroughs);
                debug!(method = %request.method(), url = %request.url(), ?reason, "pass-through");
                let response = self.network(request).await?;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                    route,
                })
            }
            FetchRoute::CacheFirst => match self.storage.match_any(request).await? {
                Some(response) => {
                    AtomicStats::bump(&self.stats.cache_hits);
                    debug!(url = %request.url(), "cache hit");
                    Ok(FetchOutcome {
                        response,
                        source: ResponseSource::Cache,
                        route,
                    })
                }
                None => {
                    AtomicStats::bump(&self.stats.cache_misses);
                    debug!(url = %request.url(), "cache miss");
                    let response = self.network(request).await?;
                    Ok(FetchOutcome {
                        response,
                        source: ResponseSource::Network,
                        route,
                    })
                }
            },
        }
    }

    async fn network(&self, request: &Request) -> Result<Response> {
        self.fetcher.fetch(request).await.map_err(|e| {
            AtomicStats::bump(&self.stats.network_errors);
            warn!(url = %request.url(), error = %e, "network fetch failed");
            e
        })
    }
}
