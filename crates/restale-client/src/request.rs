//! HTTP request representation

use bytes::Bytes;
use reqwest::Method;

/// A cache-aware HTTP request
///
/// The cache key is the request URL; it must be identical between get and
/// put for a given logical resource, so the URL string is stored verbatim.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Request {
    /// Create a request with an explicit method
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// PUT request
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// DELETE request
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// HEAD request
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    /// OPTIONS request
    pub fn options(url: impl Into<String>) -> Self {
        Self::new(Method::OPTIONS, url)
    }

    /// The custom PURGE verb used for cache invalidation at proxies
    pub fn purge(url: impl Into<String>) -> Self {
        // "PURGE" is a valid method token; the fallback is unreachable
        let method = Method::from_bytes(b"PURGE").unwrap_or(Method::GET);
        Self::new(method, url)
    }

    /// Append a header; duplicates are allowed and kept in order
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a request body
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers in insertion order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Request body, if any
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The cache key for this request: its URL
    pub fn cache_key(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_method_constructors() {
        assert_eq!(Request::get("http://a/").method(), &Method::GET);
        assert_eq!(Request::post("http://a/").method(), &Method::POST);
        assert_eq!(Request::head("http://a/").method(), &Method::HEAD);
        assert_eq!(Request::purge("http://a/").method().as_str(), "PURGE");
    }

    #[test]
    fn test_cache_key_is_url() {
        let request = Request::get("http://example.com/resource?x=1");
        assert_eq!(request.cache_key(), "http://example.com/resource?x=1");
        assert_eq!(request.cache_key(), request.url());
    }

    #[test]
    fn test_duplicate_headers_kept_in_order() {
        let request = Request::get("http://a/")
            .with_header("accept", "text/html")
            .with_header("accept", "application/json");
        assert_eq!(request.headers().len(), 2);
        assert_eq!(request.headers()[0].1, "text/html");
        assert_eq!(request.headers()[1].1, "application/json");
    }

    #[test]
    fn test_body_attachment() {
        let request = Request::post("http://a/").with_body(Bytes::from_static(b"data"));
        assert_eq!(request.body().unwrap().as_ref(), b"data");
    }
}
