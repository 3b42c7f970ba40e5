//! Analysis run request

use crate::error::{ClientError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// LLM provider the backend should use for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI,
    Anthropic,
    Groq,
    Gemini,
    DeepSeek,
    Ollama,
    LMStudio,
}

impl ModelProvider {
    /// All providers known to the backend, in display order
    pub const ALL: [ModelProvider; 7] = [
        Self::OpenAI,
        Self::Anthropic,
        Self::Groq,
        Self::Gemini,
        Self::DeepSeek,
        Self::Ollama,
        Self::LMStudio,
    ];

    /// Identifier used on the wire and in URL paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Groq => "Groq",
            Self::Gemini => "Gemini",
            Self::DeepSeek => "DeepSeek",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LMStudio",
        }
    }

    /// Whether the provider runs on the user's machine
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama | Self::LMStudio)
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProvider {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .or_else(|| {
                // "lm-studio", "lm_studio"
                let squashed: String = wanted
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                Self::ALL
                    .into_iter()
                    .find(|p| p.as_str().eq_ignore_ascii_case(&squashed))
            })
            .ok_or_else(|| ClientError::InvalidRequest(format!("Unknown model provider: {}", s)))
    }
}

/// Immutable description of one analysis run.
///
/// Serializes to the JSON body the run endpoint expects. Build it with
/// [`AnalysisRequest::builder`]; it is the only way to construct one, so
/// every value has passed [`AnalysisRequest::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    tickers: Vec<String>,
    #[serde(rename = "selected_agents")]
    analysts: Vec<String>,
    model_provider: ModelProvider,
    model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_cash: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_requirement: Option<f64>,
}

impl AnalysisRequest {
    /// Create a new request builder
    pub fn builder() -> AnalysisRequestBuilder {
        AnalysisRequestBuilder::default()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn analysts(&self) -> &[String] {
        &self.analysts
    }

    pub fn model_provider(&self) -> ModelProvider {
        self.model_provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn initial_cash(&self) -> Option<f64> {
        self.initial_cash
    }

    pub fn margin_requirement(&self) -> Option<f64> {
        self.margin_requirement
    }

    /// Check the request invariants
    pub fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one ticker is required".to_string(),
            ));
        }
        if self.tickers.iter().any(|t| t.trim().is_empty()) {
            return Err(ClientError::InvalidRequest(
                "tickers must not be blank".to_string(),
            ));
        }
        if self.analysts.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one analyst is required".to_string(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "model name is required".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ClientError::InvalidRequest(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }
        if let Some(cash) = self.initial_cash {
            if !cash.is_finite() || cash < 0.0 {
                return Err(ClientError::InvalidRequest(format!(
                    "initial cash must be a non-negative amount, got {}",
                    cash
                )));
            }
        }
        if let Some(margin) = self.margin_requirement {
            if !margin.is_finite() || margin < 0.0 {
                return Err(ClientError::InvalidRequest(format!(
                    "margin requirement must be a non-negative amount, got {}",
                    margin
                )));
            }
        }
        Ok(())
    }
}

/// Builder for AnalysisRequest
#[derive(Debug, Default)]
pub struct AnalysisRequestBuilder {
    tickers: Vec<String>,
    analysts: Vec<String>,
    model_provider: Option<ModelProvider>,
    model_name: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    initial_cash: Option<f64>,
    margin_requirement: Option<f64>,
}

impl AnalysisRequestBuilder {
    /// Add a ticker symbol (upper-cased, duplicates ignored)
    pub fn ticker(mut self, ticker: impl AsRef<str>) -> Self {
        let ticker = ticker.as_ref().trim().to_uppercase();
        if !self.tickers.contains(&ticker) {
            self.tickers.push(ticker);
        }
        self
    }

    /// Add several ticker symbols
    pub fn tickers<I, S>(self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tickers.into_iter().fold(self, |builder, t| builder.ticker(t))
    }

    /// Add an analyst identifier (duplicates ignored)
    pub fn analyst(mut self, analyst: impl Into<String>) -> Self {
        let analyst = analyst.into();
        if !self.analysts.contains(&analyst) {
            self.analysts.push(analyst);
        }
        self
    }

    /// Add several analyst identifiers
    pub fn analysts<I, S>(self, analysts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        analysts.into_iter().fold(self, |builder, a| builder.analyst(a))
    }

    /// Set the model provider and model
    pub fn model(mut self, provider: ModelProvider, model_name: impl Into<String>) -> Self {
        self.model_provider = Some(provider);
        self.model_name = Some(model_name.into());
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn initial_cash(mut self, cash: f64) -> Self {
        self.initial_cash = Some(cash);
        self
    }

    pub fn margin_requirement(mut self, margin: f64) -> Self {
        self.margin_requirement = Some(margin);
        self
    }

    /// Build the request, checking every invariant
    pub fn build(self) -> Result<AnalysisRequest> {
        let model_provider = self.model_provider.ok_or_else(|| {
            ClientError::InvalidRequest("model provider is required".to_string())
        })?;

        let request = AnalysisRequest {
            tickers: self.tickers,
            analysts: self.analysts,
            model_provider,
            model_name: self.model_name.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            initial_cash: self.initial_cash,
            margin_requirement: self.margin_requirement,
        };

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_builder_normalizes_tickers() {
        let request = AnalysisRequest::builder()
            .tickers(["aapl", " msft ", "AAPL"])
            .analyst("warren_buffett")
            .model(ModelProvider::OpenAI, "gpt-4o")
            .build()
            .unwrap();

        assert_eq!(request.tickers(), ["AAPL", "MSFT"]);
        assert_eq!(request.analysts(), ["warren_buffett"]);
    }

    #[test]
    fn test_wire_body() {
        let request = AnalysisRequest::builder()
            .ticker("NVDA")
            .analysts(["ben_graham", "technicals_analyst"])
            .model(ModelProvider::LMStudio, "qwen3-8b")
            .start_date(date(2024, 1, 1))
            .end_date(date(2024, 1, 31))
            .initial_cash(100_000.0)
            .build()
            .unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "tickers": ["NVDA"],
                "selected_agents": ["ben_graham", "technicals_analyst"],
                "model_provider": "LMStudio",
                "model_name": "qwen3-8b",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "initial_cash": 100000.0
            })
        );
    }

    #[test]
    fn test_rejects_missing_tickers_and_analysts() {
        let err = AnalysisRequest::builder()
            .analyst("ray_dalio")
            .model(ModelProvider::Groq, "llama3")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ticker"));

        let err = AnalysisRequest::builder()
            .ticker("AAPL")
            .model(ModelProvider::Groq, "llama3")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("analyst"));
    }

    #[test]
    fn test_rejects_inverted_date_range() {
        let result = AnalysisRequest::builder()
            .ticker("AAPL")
            .analyst("peter_lynch")
            .model(ModelProvider::Anthropic, "claude")
            .start_date(date(2024, 2, 1))
            .end_date(date(2024, 1, 1))
            .build();
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let base = || {
            AnalysisRequest::builder()
                .ticker("AAPL")
                .analyst("peter_lynch")
                .model(ModelProvider::Gemini, "gemini-pro")
        };
        assert!(base().initial_cash(-1.0).build().is_err());
        assert!(base().margin_requirement(-0.5).build().is_err());
        assert!(base().initial_cash(f64::NAN).build().is_err());
        assert!(base().initial_cash(f64::INFINITY).build().is_err());
        assert!(base().margin_requirement(f64::INFINITY).build().is_err());
        assert!(base().initial_cash(0.0).margin_requirement(0.0).build().is_ok());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<ModelProvider>().unwrap(), ModelProvider::OpenAI);
        assert_eq!("LM-Studio".parse::<ModelProvider>().unwrap(), ModelProvider::LMStudio);
        assert_eq!("deepseek".parse::<ModelProvider>().unwrap(), ModelProvider::DeepSeek);
        assert!("mistral".parse::<ModelProvider>().is_err());
        assert!(ModelProvider::Ollama.is_local());
        assert!(!ModelProvider::OpenAI.is_local());
    }
}
