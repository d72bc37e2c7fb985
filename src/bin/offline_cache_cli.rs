//! offline-cache-cli — drive the offline asset cache against an on-disk storage root
//!
//! Usage:
//!   offline-cache-cli install [--dir <path>] [--config <file>]     Precache assets and activate
//!   offline-cache-cli activate [--dir <path>] [--config <file>]    Evict stale cache versions
//!   offline-cache-cli fetch <url> [--method M] [--offline]         Run a request through the handler
//!   offline-cache-cli list [--dir <path>]                          List cache stores and entries

use anyhow::{bail, Context};
use offline_asset_cache::cache::{CacheStorage, FileCacheStorage};
use offline_asset_cache::transport::{Fetcher, HttpFetcher, OfflineFetcher};
use offline_asset_cache::{Request, ServiceWorker, WorkerConfig, WorkerState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIR: &str = ".offline-cache";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "install" => cmd_install(&args[2..]).await,
        "activate" => cmd_activate(&args[2..]).await,
        "fetch" => cmd_fetch(&args[2..]).await,
        "list" => cmd_list(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("offline-cache-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"offline-cache-cli — offline asset cache tool

USAGE:
    offline-cache-cli <COMMAND> [OPTIONS]

COMMANDS:
    install                     Precache the asset list, then activate
    activate                    Delete cache stores from other versions
    fetch <url>                 Run one request through the fetch handler
    list                        List cache stores and their entries
    version                     Show version information
    help                        Show this help message

OPTIONS:
    --dir <path>                Storage root (default: {DEFAULT_DIR})
    --config <file>             YAML worker config
    --method <METHOD>           Request method for `fetch` (default: GET)
    --offline                   Disable the network for `fetch`

ENVIRONMENT:
    OFFLINE_CACHE_DIR           Storage root
    OFFLINE_CACHE_NAME          Cache version name override
    OFFLINE_CACHE_ORIGIN        Origin for relative asset paths
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn storage_dir(args: &[String]) -> PathBuf {
    if let Some(dir) = flag_value(args, "--dir") {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("OFFLINE_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(DEFAULT_DIR)
}

async fn load_config(args: &[String]) -> anyhow::Result<WorkerConfig> {
    let config = match flag_value(args, "--config") {
        Some(path) => WorkerConfig::from_path(path)
            .await
            .with_context(|| format!("loading config {path}"))?,
        None => WorkerConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

async fn open_storage(args: &[String]) -> anyhow::Result<Arc<FileCacheStorage>> {
    let dir = storage_dir(args);
    let storage = FileCacheStorage::open_root(&dir)
        .await
        .with_context(|| format!("opening storage at {}", dir.display()))?;
    Ok(Arc::new(storage))
}

fn fetcher(offline: bool) -> anyhow::Result<Arc<dyn Fetcher>> {
    if offline {
        Ok(Arc::new(OfflineFetcher))
    } else {
        Ok(Arc::new(HttpFetcher::new()?))
    }
}

async fn cmd_install(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args).await?;
    let storage = open_storage(args).await?;
    let mut worker = ServiceWorker::new(config, storage, fetcher(false)?);

    let (installed, activated) = worker.start().await?;
    println!("installed {} ({} assets)", installed.cache_name, installed.cached);
    if let Some(activated) = activated {
        for name in &activated.deleted {
            println!("deleted {name}");
        }
        println!("active {}", activated.cache_name);
    }
    Ok(())
}

async fn cmd_activate(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args).await?;
    let storage = open_storage(args).await?;
    let mut worker = ServiceWorker::restore(config, storage, fetcher(true)?).await?;

    match worker.state() {
        WorkerState::Waiting => {
            let activated = worker.activate().await?;
            for name in &activated.deleted {
                println!("deleted {name}");
            }
            println!("active {}", activated.cache_name);
        }
        WorkerState::Active => println!("already active: {}", worker.config().cache_name),
        state => bail!(
            "cache {} is not installed (worker is {state})",
            worker.config().cache_name
        ),
    }
    Ok(())
}

async fn cmd_fetch(args: &[String]) -> anyhow::Result<()> {
    let Some(url) = args.first().filter(|a| !a.starts_with("--")) else {
        bail!("fetch requires a URL");
    };
    let method = flag_value(args, "--method").unwrap_or("GET");
    let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid method {method}"))?;

    let config = load_config(args).await?;
    let request = Request::new(method, config.origin.join(url)?);
    let storage = open_storage(args).await?;
    let worker =
        ServiceWorker::restore(config, storage, fetcher(has_flag(args, "--offline"))?).await?;

    let outcome = worker.handle_fetch(&request).await?;
    println!(
        "{:?} via {:?}: HTTP {} {} ({} bytes)",
        outcome.route,
        outcome.source,
        outcome.response.status,
        outcome.response.status_text,
        outcome.response.body.len()
    );
    Ok(())
}

async fn cmd_list(args: &[String]) -> anyhow::Result<()> {
    let storage = open_storage(args).await?;
    let names = storage.keys().await?;
    if names.is_empty() {
        println!("no cache stores in {}", storage.root().display());
        return Ok(());
    }
    for name in names {
        let store = storage.open(&name).await?;
        let keys = store.keys().await?;
        println!("{name} ({} entries)", keys.len());
        for key in keys {
            println!("  {key}");
        }
    }
    Ok(())
}
