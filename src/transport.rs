//! Transport seam
//!
//! The executor drives any `tower::Service<RequestDescriptor>` producing a
//! [`TransportResponse`] or a [`TransportError`]. Keeping the seam a Tower
//! service means tests swap in `tower::service_fn` fakes with scripted
//! outcomes, and production uses [`ReqwestTransport`]. Transports do not
//! enforce timeouts; the executor applies the resolved per-attempt deadline
//! around the call.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::debug;

use crate::error::TransportError;
use crate::request::{Method, RequestDescriptor};

/// Raw response surfaced by a transport service.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Assemble a response; header names are lowercased for lookup.
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    /// The `content-type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Transport backed by `reqwest`.
///
/// Holds two clients so the descriptor's `follow_redirects` flag can be
/// honored per call; reqwest fixes the redirect policy at client build time.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    redirecting: reqwest::Client,
    direct: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport over freshly built clients with default pooling.
    pub fn new() -> Self {
        // Client construction only fails when the TLS backend cannot be
        // initialized, the same condition under which `Client::new` panics.
        let direct = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client construction");
        Self {
            redirecting: reqwest::Client::new(),
            direct,
        }
    }

    /// Reuse caller-built clients (connection pools, proxies, TLS config).
    pub fn from_clients(redirecting: reqwest::Client, direct: reqwest::Client) -> Self {
        Self { redirecting, direct }
    }

    fn client_for(&self, descriptor: &RequestDescriptor) -> reqwest::Client {
        if descriptor.follow_redirects {
            self.redirecting.clone()
        } else {
            self.direct.clone()
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<RequestDescriptor> for ReqwestTransport {
    type Response = TransportResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, descriptor: RequestDescriptor) -> Self::Future {
        let client = self.client_for(&descriptor);
        Box::pin(async move { send(client, descriptor).await })
    }
}

async fn send(
    client: reqwest::Client,
    descriptor: RequestDescriptor,
) -> Result<TransportResponse, TransportError> {
    debug!(
        "dispatching {} {} over reqwest",
        descriptor.method, descriptor.url
    );
    let method = match descriptor.method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    };

    let mut builder = client.request(method, &descriptor.url);
    match &descriptor.headers {
        Some(headers) => {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        None if descriptor.body.is_some() => {
            builder = builder.header("content-type", "application/json");
        }
        None => {}
    }
    if let Some(body) = &descriptor.body {
        builder = builder.json(body);
    }

    let response = builder.send().await.map_err(from_reqwest)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response.bytes().await.map_err(from_reqwest)?.to_vec();
    Ok(TransportResponse::new(status, headers, body))
}

fn from_reqwest(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(std::time::Duration::ZERO)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let resp = TransportResponse::new(200, headers, b"{}".to_vec());
        assert_eq!(resp.content_type(), Some("application/json"));
    }

    #[test]
    fn test_text_is_lossy() {
        let resp = TransportResponse::new(200, HashMap::new(), vec![0xff, 0xfe]);
        assert!(!resp.text().is_empty());

        let resp = TransportResponse::new(200, HashMap::new(), b"hello".to_vec());
        assert_eq!(resp.text(), "hello");
    }
}
