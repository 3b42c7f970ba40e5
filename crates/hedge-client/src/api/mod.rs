//! REST wrappers for the hedge fund backend
//!
//! Everything except the streaming run: the analyst roster, LLM providers and
//! their models, local model server status, and stock lookups. All routes
//! answer with a `{success, data, error}` envelope.

mod types;

pub use types::{
    AnalystInfo, CompanyFacts, ModelInfo, ProviderInfo, ProviderStatus, StockSearchResult,
    TickerValidation,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::request::ModelProvider;
use crate::transport::{ReqwestTransport, build_http_client};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};
use types::Envelope;
use url::Url;

/// Client for the backend's REST routes
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Create from `HEDGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Share the connection pool of a streaming transport
    pub fn with_transport(config: ClientConfig, transport: &ReqwestTransport) -> Self {
        Self {
            client: transport.client().clone(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `true` if the backend answers `/health` with a success status
    pub async fn health(&self) -> bool {
        let url = match self.config.endpoint("/health") {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build health URL: {}", e);
                return false;
            }
        };
        match self
            .client
            .get(url)
            .timeout(self.config.request_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Analysts available for `selected_agents`, in the backend's display order
    pub async fn analysts(&self) -> Result<Vec<AnalystInfo>> {
        self.get("/analysts").await
    }

    pub async fn providers(&self) -> Result<Vec<ProviderInfo>> {
        self.get("/llm/providers").await
    }

    /// Models offered by one provider. Local providers report an empty list
    /// when their server is not running.
    pub async fn provider_models(&self, provider: ModelProvider) -> Result<Vec<ModelInfo>> {
        self.get(&format!("/llm/providers/{}/models", provider.as_str()))
            .await
    }

    /// Status of a local model server (Ollama or LM Studio)
    pub async fn provider_status(&self, provider: ModelProvider) -> Result<ProviderStatus> {
        let path = match provider {
            ModelProvider::Ollama => "/llm/ollama/status",
            ModelProvider::LMStudio => "/llm/lmstudio/status",
            other => {
                return Err(ClientError::InvalidRequest(format!(
                    "{} is not a local provider",
                    other
                )));
            }
        };
        self.get(path).await
    }

    /// Search stocks by ticker or company name
    pub async fn search_stocks(&self, query: &str) -> Result<Vec<StockSearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }

        let mut url = self.config.endpoint("/stocks/search")?;
        url.query_pairs_mut().append_pair("q", query);
        self.fetch(self.client.get(url)).await
    }

    pub async fn stock_facts(&self, ticker: &str) -> Result<CompanyFacts> {
        let ticker = normalize_ticker(ticker)?;
        let url = self.stock_url(&[&ticker, "facts"])?;
        self.fetch(self.client.get(url)).await
    }

    /// Ask the backend which tickers it can resolve
    pub async fn validate_tickers<S: AsRef<str>>(&self, tickers: &[S]) -> Result<TickerValidation> {
        let tickers = tickers
            .iter()
            .map(|t| normalize_ticker(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if tickers.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one ticker is required".to_string(),
            ));
        }

        let url = self.config.endpoint("/stocks/validate")?;
        self.fetch(self.client.post(url).json(&json!({ "tickers": tickers })))
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.endpoint(path)?;
        self.fetch(self.client.get(url)).await
    }

    /// `/stocks/<segments...>` with each segment percent-encoded
    fn stock_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.endpoint("/stocks")?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Config("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.timeout(self.config.request_timeout).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("API request failed with {}", status);
            return Err(ClientError::http(status, error_detail(&body)));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        open_envelope(envelope)
    }
}

fn open_envelope<T>(envelope: Envelope<T>) -> Result<T> {
    if !envelope.success {
        return Err(ClientError::Api(
            envelope
                .error
                .unwrap_or_else(|| "request failed without an error message".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| ClientError::Api("response contained no data".to_string()))
}

/// Error routes answer `{"detail": "..."}`; fall back to the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn normalize_ticker(ticker: &str) -> Result<String> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ClientError::InvalidRequest(
            "ticker must not be empty".to_string(),
        ));
    }
    Ok(ticker)
}
