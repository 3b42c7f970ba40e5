//! Response types of the hedge fund REST API

use serde::{Deserialize, Serialize};

/// `{"success": bool, "data": T?, "error": string?}` wrapper used by every route
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Analyst the backend can run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystInfo {
    /// Identifier to send in `selected_agents`
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name to send in `model_name`
    pub id: String,
    /// Display name
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub description: String,
}

/// Whether a local model server is up, and what it has loaded
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub running: bool,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSearchResult {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Company facts for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub number_of_employees: Option<u64>,
    #[serde(default)]
    pub website_url: Option<String>,
}

/// Tickers split by whether the backend could resolve them
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickerValidation {
    #[serde(default)]
    pub valid: Vec<String>,
    #[serde(default)]
    pub invalid: Vec<String>,
}

impl TickerValidation {
    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}
