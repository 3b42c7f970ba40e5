//! Events produced by an analysis run

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Progress report from one agent working on a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Agent emitting the update (e.g. "warren_buffett_agent")
    pub agent: String,
    /// Ticker being worked on; `None` for portfolio-level work
    #[serde(default)]
    pub ticker: Option<String>,
    pub status: String,
    /// Backend timestamp, passed through untouched
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ticker {
            Some(ticker) => write!(f, "[{}] {}: {}", ticker, self.agent, self.status),
            None => write!(f, "[portfolio] {}: {}", self.agent, self.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Short,
    Cover,
    Hold,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Short => "short",
            Self::Cover => "cover",
            Self::Hold => "hold",
        };
        f.write_str(s)
    }
}

/// Portfolio manager's decision for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDecision {
    pub action: TradeAction,
    /// Whole number of shares; LLMs sometimes send `10.0`
    #[serde(default, deserialize_with = "whole_quantity")]
    pub quantity: u64,
    /// 0 to 100
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// One analyst's view on one ticker.
///
/// The risk manager reports position limits instead of a signal; those
/// fields land in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalystSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
    /// 0 to 100
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Value,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn whole_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(0);
    };
    if let Some(quantity) = number.as_u64() {
        return Ok(quantity);
    }
    match number.as_f64() {
        Some(q) if q >= 0.0 && q.trunc() == q && q <= u64::MAX as f64 => Ok(q as u64),
        _ => Err(D::Error::custom(format!(
            "quantity must be a whole number >= 0, got {number}"
        ))),
    }
}

/// Final output of a completed run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// Ticker -> decision
    #[serde(default)]
    pub decisions: BTreeMap<String, TradingDecision>,
    /// Analyst -> ticker -> signal
    #[serde(default)]
    pub analyst_signals: BTreeMap<String, BTreeMap<String, AnalystSignal>>,
}

impl RunResult {
    pub fn decision(&self, ticker: &str) -> Option<&TradingDecision> {
        self.decisions.get(ticker)
    }

    /// All analyst signals for one ticker, keyed by analyst
    pub fn signals_for<'a>(
        &'a self,
        ticker: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a AnalystSignal)> + 'a {
        self.analyst_signals
            .iter()
            .filter_map(move |(analyst, by_ticker)| {
                by_ticker.get(ticker).map(|signal| (analyst.as_str(), signal))
            })
    }
}

/// Reasoning text for display; structured reasoning is rendered as JSON.
pub fn reasoning_text(reasoning: &Value) -> String {
    match reasoning {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One decoded event from the run stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress(ProgressUpdate),
    Complete(RunResult),
    Error(String),
}

impl StreamEvent {
    /// `Complete` and `Error` end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}
