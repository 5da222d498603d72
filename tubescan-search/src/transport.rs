//! Transport seam: the engine only needs text-returning GET/POST.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tubescan_http::{HeaderMap, HeaderName, HeaderValue, HttpClient, RequestOpts};

use crate::decode::BASE_URL;
use crate::error::SearchError;
use crate::options::TransportOptions;

/// Performs one HTTP request and hands back the full response text.
/// Retry/backoff policy lives behind this seam, not in the engine.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, opts: &TransportOptions) -> Result<String, SearchError>;
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        opts: &TransportOptions,
    ) -> Result<String, SearchError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str, opts: &TransportOptions) -> Result<String, SearchError> {
        (**self).get(url, opts).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        opts: &TransportOptions,
    ) -> Result<String, SearchError> {
        (**self).post_json(url, body, opts).await
    }
}

/// Real transport over [`tubescan_http::HttpClient`].
pub struct NetTransport {
    http: HttpClient,
}

impl NetTransport {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self {
            http: HttpClient::new(BASE_URL)?,
        })
    }
}

#[async_trait]
impl Transport for NetTransport {
    async fn get(&self, url: &str, opts: &TransportOptions) -> Result<String, SearchError> {
        let body = self.http.get_text(url, request_opts(opts)).await?;
        Ok(body)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        opts: &TransportOptions,
    ) -> Result<String, SearchError> {
        let text = self.http.post_json_text(url, body, request_opts(opts)).await?;
        Ok(text)
    }
}

fn request_opts(opts: &TransportOptions) -> RequestOpts<'static> {
    let mut headers = HeaderMap::new();
    for (name, value) in &opts.headers {
        // Caller-supplied strings; anything unrepresentable is dropped.
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        } else {
            tracing::warn!(target: "search", header = %name, "dropping malformed request header");
        }
    }
    RequestOpts {
        timeout: opts.timeout_ms.map(Duration::from_millis),
        retries: opts.retries,
        headers: (!headers.is_empty()).then_some(headers),
        query: None,
        allow_absolute: true,
    }
}
