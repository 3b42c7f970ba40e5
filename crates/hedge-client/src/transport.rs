//! Byte-stream transport used by the streaming client
//!
//! The session depends only on [`Transport`]: issue one request, get the
//! response body back as a stream of byte chunks. Dropping the returned
//! stream aborts the request.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use std::pin::Pin;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Response body as a sequence of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// One outbound streaming request
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl StreamRequest {
    /// POST a JSON body, asking for an event stream back
    pub fn post_json(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: vec![(ACCEPT.as_str().to_string(), "text/event-stream".to_string())],
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Issues a streaming request and hands back its body
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send the request and wait for response headers.
    ///
    /// Implementations should give up with [`ClientError::Cancelled`] once
    /// `cancel` fires. Connection failures and non-success statuses are
    /// reported here; failures while reading surface as stream items.
    async fn open(&self, request: StreamRequest, cancel: CancellationToken) -> Result<ByteStream>;
}

/// [`Transport`] over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the HTTP client from config. Only the connect timeout applies;
    /// a run may legitimately stream for many minutes.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(build_http_client(config)?))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Shared HTTP client with default headers from config
pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.headers {
        let name = HeaderName::from_str(key).map_err(|e| {
            ClientError::Config(format!("Invalid header name '{}': {}", key, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ClientError::Config(format!("Invalid header value for '{}': {}", key, e))
        })?;
        headers.insert(name, value);
    }

    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: StreamRequest, cancel: CancellationToken) -> Result<ByteStream> {
        debug!("Opening stream {} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = builder.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Stream request to {} failed with {}", request.url, status);
            return Err(ClientError::http(status, body));
        }

        debug!("Stream opened with status {}", status);
        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(ClientError::from)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_json_asks_for_event_stream() {
        let url = Url::parse("http://localhost:8000/hedge-fund/run").unwrap();
        let request = StreamRequest::post_json(url, json!({"tickers": ["AAPL"]}))
            .with_header("X-Trace", "abc");

        assert_eq!(request.method, Method::POST);
        assert!(
            request
                .headers
                .contains(&("accept".to_string(), "text/event-stream".to_string()))
        );
        assert_eq!(request.headers.len(), 2);
    }

    #[test]
    fn test_http_client_rejects_bad_header() {
        let mut config = ClientConfig::default();
        config.headers.insert("bad header".to_string(), "v".to_string());
        assert!(matches!(
            build_http_client(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let transport = ReqwestTransport::from_config(&ClientConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let url = Url::parse("http://127.0.0.1:9/hedge-fund/run").unwrap();
        let result = transport
            .open(StreamRequest::post_json(url, json!({})), cancel)
            .await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }
}
