use crate::cache::RequestKey;
use crate::Result;
use reqwest::Method;
use url::Url;

/// A request intercepted from a controlled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse an absolute URL into a request with the given method.
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    pub fn get_str(url: &str) -> Result<Self> {
        Self::parse(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Path component of the URL, always starting with `/` for http(s) URLs.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Identity used for cache lookups.
    pub fn key(&self) -> RequestKey {
        RequestKey::from_url(&self.url)
    }
}
