//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use offline_asset_cache::transport::{Fetcher, TransportError};
use offline_asset_cache::{Request, Response, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fake network with a fixed set of routes and an on/off switch.
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn route(self, url: &str, status: u16, body: &[u8]) -> Self {
        self.set_route(url, status, body);
        self
    }

    pub fn set_route(&self, url: &str, status: u16, body: &[u8]) {
        let url = url::Url::parse(url).unwrap().to_string();
        self.routes
            .lock()
            .unwrap()
            .insert(url, (status, body.to_vec()));
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Offline(request.url().to_string()).into());
        }
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(request.url().as_str())
            .cloned();
        match route {
            Some((status, body)) => Ok(Response::new(request.url().clone(), status, body)),
            None => Ok(Response::new(request.url().clone(), 404, "not found")),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
