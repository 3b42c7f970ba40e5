//! Scripted transport and helpers shared by the unit tests

use crate::error::{ClientError, Result};
use crate::event::StreamEvent;
use crate::transport::{ByteStream, StreamRequest, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Transport that hands out one pre-built body
pub(crate) struct ScriptedTransport {
    body: Mutex<Option<Result<ByteStream>>>,
    requests: Mutex<Vec<StreamRequest>>,
    opens: AtomicUsize,
}

impl ScriptedTransport {
    fn new(body: Result<ByteStream>) -> Self {
        Self {
            body: Mutex::new(Some(body)),
            requests: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
        }
    }

    /// Body that yields `chunks` then ends
    pub(crate) fn from_chunks(chunks: Vec<Result<Bytes>>) -> Self {
        Self::new(Ok(Box::pin(futures::stream::iter(chunks))))
    }

    /// Body fed by the returned sender; dropping the sender ends it
    pub(crate) fn channel() -> (Self, mpsc::UnboundedSender<Result<Bytes>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let body = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        (Self::new(Ok(Box::pin(body))), tx)
    }

    /// `open` fails with `error`
    pub(crate) fn failing(error: ClientError) -> Self {
        Self::new(Err(error))
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: StreamRequest, _cancel: CancellationToken) -> Result<ByteStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let body = self.body.lock().unwrap().take();
        body.unwrap_or_else(|| Err(ClientError::Other("script already consumed".to_string())))
    }
}

/// Drain a channel until every sender is gone
pub(crate) async fn collect(mut rx: mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub(crate) fn run_url() -> Url {
    Url::parse("http://localhost:8000/hedge-fund/run").unwrap()
}

pub(crate) fn progress_line(agent: &str, ticker: &str, status: &str) -> String {
    let frame = json!({
        "type": "progress",
        "agent": agent,
        "ticker": ticker,
        "status": status,
    });
    format!("data: {}\n\n", frame)
}

pub(crate) fn complete_line() -> String {
    let frame = json!({
        "type": "complete",
        "data": {
            "decisions": {
                "AAPL": {"action": "buy", "quantity": 50, "confidence": 82.5, "reasoning": "Strong margins"}
            },
            "analyst_signals": {
                "warren_buffett_agent": {
                    "AAPL": {"signal": "bullish", "confidence": 90, "reasoning": {"moat": "wide"}}
                },
                "risk_management_agent": {
                    "AAPL": {
                        "remaining_position_limit": 20000.0,
                        "current_price": 187.3,
                        "reasoning": {"portfolio_value": 100000.0, "current_position": 0.0}
                    }
                }
            }
        }
    });
    format!("data: {}\n\n", frame)
}

pub(crate) fn error_line(message: &str) -> String {
    format!("data: {}\n\n", json!({"type": "error", "message": message}))
}

pub(crate) fn chunk(text: &str) -> Result<Bytes> {
    Ok(Bytes::copy_from_slice(text.as_bytes()))
}
