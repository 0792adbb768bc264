//! Request descriptor consumed by the executor.
//!
//! A [`RequestDescriptor`] is an immutable description of one logical call,
//! produced by the caller (or an upstream validation layer that has already
//! checked URL well-formedness). The executor never mutates it; retries
//! re-dispatch clones of the same descriptor.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods the executor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Uppercase wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one logical HTTP call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Target URL, pre-validated by the caller
    pub url: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Optional JSON body sent with the request
    #[serde(default)]
    pub body: Option<Value>,

    /// Optional headers; when absent and a body is present, the transport
    /// sends `Content-Type: application/json`
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Per-attempt timeout override; falls back to the executor's timeout
    #[serde(default)]
    pub timeout: Option<Duration>,

    /// Whether the transport follows redirects for this call
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

fn default_follow_redirects() -> bool {
    true
}

impl RequestDescriptor {
    /// Descriptor for `method url` with no body, headers, or overrides.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: None,
            timeout: None,
            follow_redirects: true,
        }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Shorthand for a POST descriptor.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header, creating the map on first use.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Override the per-attempt timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable redirect following for this call.
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// Breaker-registry key for this request's target: `scheme://host:port`.
    ///
    /// Returns `None` when the URL cannot be parsed or has no host; such
    /// requests share a single fallback breaker under per-host scoping.
    pub(crate) fn target_key(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        let host = parsed.host_str()?.to_string();
        match parsed.port_or_known_default() {
            Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
            None => Some(format!("{}://{}", parsed.scheme(), host)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let req = RequestDescriptor::get("https://example.com/posts/1");
        assert_eq!(req.method, Method::Get);
        assert!(req.body.is_none());
        assert!(req.follow_redirects);
        assert!(req.timeout.is_none());
    }

    #[test]
    fn test_builder_chains() {
        let req = RequestDescriptor::post("https://example.com/posts")
            .with_body(serde_json::json!({"title": "foo"}))
            .with_header("x-request-id", "abc123")
            .with_timeout(Duration::from_secs(5))
            .without_redirects();
        assert_eq!(req.method.as_str(), "POST");
        assert!(req.body.is_some());
        assert_eq!(
            req.headers.as_ref().unwrap().get("x-request-id").unwrap(),
            "abc123"
        );
        assert!(!req.follow_redirects);
    }

    #[test]
    fn test_target_key_includes_scheme_and_port() {
        let req = RequestDescriptor::get("https://api.example.com/v1/things");
        assert_eq!(
            req.target_key().as_deref(),
            Some("https://api.example.com:443")
        );

        let req = RequestDescriptor::get("http://localhost:8080/health");
        assert_eq!(req.target_key().as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let req: RequestDescriptor =
            serde_json::from_value(serde_json::json!({"url": "https://example.com"})).unwrap();
        assert_eq!(req.method, Method::Get);
        assert!(req.follow_redirects);
    }
}
