//! Worker configuration: cache version, origin, asset list and bypass rules.
//!
//! Defaults reproduce the shipped asset manifest. A YAML file can replace
//! any of them, and `OFFLINE_CACHE_NAME` / `OFFLINE_CACHE_ORIGIN` override
//! the version name and origin at startup.

use crate::types::Request;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use url::Url;

pub const DEFAULT_CACHE_NAME: &str = "p2p-connect-v2";

pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

pub const DEFAULT_ASSETS: &[&str] = &[
    "/static/manifest.json",
    "/static/images/logo_192.png",
    "/static/images/logo_512.png",
    "https://cdn.tailwindcss.com",
    "https://unpkg.com/htmx.org@1.9.6",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
];

/// Paths that are never served from cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassRules {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl Default for BypassRules {
    fn default() -> Self {
        Self {
            exact: vec!["/".to_string()],
            prefixes: vec![
                "/chat/".to_string(),
                "/ws/".to_string(),
                "/auth/".to_string(),
            ],
        }
    }
}

impl BypassRules {
    pub fn matches(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.prefixes.iter().any(|p| path.starts_with(p))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Version name of the current cache store.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
    /// Base for resolving relative asset paths.
    #[serde(default = "default_origin")]
    pub origin: Url,
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    #[serde(default)]
    pub bypass: BypassRules,
    /// Take control right after install instead of waiting for old clients.
    #[serde(default = "default_skip_waiting")]
    pub skip_waiting: bool,
}

fn default_skip_waiting() -> bool {
    true
}

fn default_cache_name() -> String {
    DEFAULT_CACHE_NAME.to_string()
}

fn default_origin() -> Url {
    Url::parse(DEFAULT_ORIGIN).expect("DEFAULT_ORIGIN must be a valid URL")
}

fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            assets: default_assets(),
            bypass: BypassRules::default(),
            skip_waiting: default_skip_waiting(),
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bypass(mut self, bypass: BypassRules) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn with_skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml_str(&text)
    }

    /// Apply `OFFLINE_CACHE_NAME` and `OFFLINE_CACHE_ORIGIN` when set.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(name) = env::var("OFFLINE_CACHE_NAME") {
            self.cache_name = name;
        }
        if let Ok(origin) = env::var("OFFLINE_CACHE_ORIGIN") {
            self.origin = Url::parse(&origin).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid origin: {}", e),
                    ErrorContext::new()
                        .with_field_path("OFFLINE_CACHE_ORIGIN")
                        .with_details(origin.clone())
                        .with_source("worker_config"),
                )
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_name.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "cache name must not be empty",
                ErrorContext::new()
                    .with_field_path("cache_name")
                    .with_source("worker_config"),
            ));
        }
        if self.origin.cannot_be_a_base() {
            return Err(Error::configuration_with_context(
                "origin cannot be used to resolve relative assets",
                ErrorContext::new()
                    .with_field_path("origin")
                    .with_details(self.origin.to_string())
                    .with_source("worker_config"),
            ));
        }
        let paths = self
            .bypass
            .exact
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("bypass.exact[{}]", i), p))
            .chain(
                self.bypass
                    .prefixes
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (format!("bypass.prefixes[{}]", i), p)),
            );
        for (field, path) in paths {
            if !path.starts_with('/') {
                return Err(Error::configuration_with_context(
                    "bypass paths must start with '/'",
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_details(path.clone())
                        .with_source("worker_config"),
                ));
            }
        }
        Ok(())
    }

    /// Resolve the asset list into GET requests, relative entries against `origin`.
    pub fn asset_requests(&self) -> Result<Vec<Request>> {
        self.assets
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let url = self.origin.join(asset).map_err(|e| {
                    Error::configuration_with_context(
                        format!("invalid asset URL: {}", e),
                        ErrorContext::new()
                            .with_field_path(format!("assets[{}]", i))
                            .with_details(asset.clone())
                            .with_source("worker_config"),
                    )
                })?;
                Ok(Request::get(url))
            })
            .collect()
    }
}
