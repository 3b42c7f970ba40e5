//! Event extraction from `data: <json>` lines

use crate::event::{AnalystSignal, ProgressUpdate, RunResult, StreamEvent, TradingDecision};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Prefix marking an application frame
pub const DATA_PREFIX: &str = "data: ";

/// Message used when an `error` frame carries no message
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error occurred during analysis";

/// Outcome of parsing one framed line
#[derive(Debug)]
pub enum Frame {
    /// Blank line, comment, or any line without the data prefix
    Ignored,
    /// Data frame whose payload could not be decoded
    Malformed { payload: String, reason: String },
    /// Well-formed frame of a kind this client does not handle
    Unknown { kind: Option<String> },
    Event(StreamEvent),
}

/// Classify one line of the stream body
pub fn parse_line(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() {
        return Frame::Ignored;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return malformed(payload, e.to_string()),
    };

    let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some("progress") => match serde_json::from_value::<ProgressUpdate>(value) {
            Ok(update) => Frame::Event(StreamEvent::Progress(update)),
            Err(e) => malformed(payload, e.to_string()),
        },
        Some("complete") => match decode_result(value) {
            Ok(result) => Frame::Event(StreamEvent::Complete(result)),
            Err(reason) => Frame::Event(StreamEvent::Error(format!(
                "Received an unreadable analysis result: {reason}"
            ))),
        },
        Some("error") => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(DEFAULT_ERROR_MESSAGE);
            Frame::Event(StreamEvent::Error(message.to_string()))
        }
        other => Frame::Unknown {
            kind: other.map(str::to_string),
        },
    }
}

/// The result normally sits under `data`; older backends send it inline.
///
/// Entries that fail to decode are logged and dropped; the rest of the
/// result is still delivered. Only a result whose maps have the wrong
/// JSON type is rejected.
fn decode_result(mut value: Value) -> Result<RunResult, String> {
    let nested = value.get("data").is_some_and(Value::is_object);
    let mut body = if nested { value["data"].take() } else { value };

    let mut result = RunResult::default();
    for (ticker, entry) in take_object(&mut body, "decisions")? {
        match serde_json::from_value::<TradingDecision>(entry) {
            Ok(decision) => {
                result.decisions.insert(ticker, decision);
            }
            Err(e) => warn!("Dropping decision for {}: {}", ticker, e),
        }
    }

    for (analyst, by_ticker) in take_object(&mut body, "analyst_signals")? {
        let Value::Object(by_ticker) = by_ticker else {
            warn!("Dropping signals from {}: not an object", analyst);
            continue;
        };
        let mut signals = BTreeMap::new();
        for (ticker, entry) in by_ticker {
            match serde_json::from_value::<AnalystSignal>(entry) {
                Ok(signal) => {
                    signals.insert(ticker, signal);
                }
                Err(e) => warn!("Dropping {} signal for {}: {}", analyst, ticker, e),
            }
        }
        result.analyst_signals.insert(analyst, signals);
    }
    Ok(result)
}

fn take_object(body: &mut Value, key: &str) -> Result<Map<String, Value>, String> {
    match body.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(format!("`{key}` should be an object, got {other}")),
    }
}

fn malformed(payload: &str, reason: String) -> Frame {
    Frame::Malformed {
        payload: payload.to_string(),
        reason,
    }
}
