use bytes::Bytes;
use url::Url;

/// Snapshot of a response, as returned by the network or stored in a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status in the 200..=299 range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:8000/static/manifest.json").unwrap()
    }

    #[test]
    fn test_ok_range() {
        assert!(Response::new(url(), 200, "").ok());
        assert!(Response::new(url(), 204, "").ok());
        assert!(!Response::new(url(), 304, "").ok());
        assert!(!Response::new(url(), 404, "").ok());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let resp = Response::new(url(), 200, "{}").with_header("Content-Type", "application/json");
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.header("etag"), None);
    }
}
