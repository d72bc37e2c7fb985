//! 类型模块：定义拦截请求与缓存响应快照的核心数据类型。
//!
//! # Types Module
//!
//! Core request/response types shared by the cache storage, the network
//! fetcher and the lifecycle handler.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Request`] | Intercepted request: method, absolute URL, headers |
//! | [`Response`] | Response snapshot: final URL, status, headers, body |
//!
//! ## Example
//!
//! ```rust
//! use offline_asset_cache::types::{Request, Response};
//! use bytes::Bytes;
//!
//! let req = Request::get_str("https://example.com/static/app.css").unwrap();
//! assert_eq!(req.path(), "/static/app.css");
//!
//! let resp = Response::new(req.url().clone(), 200, Bytes::from_static(b"body{}"));
//! assert!(resp.ok());
//! ```

pub mod request;
pub mod response;

pub use request::Request;
pub use response::Response;
