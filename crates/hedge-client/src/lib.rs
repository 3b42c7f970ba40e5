//! Streaming client for the AI hedge fund analysis service
//!
//! A run is started with [`StreamingAnalysisClient::start`]. The backend
//! answers with a long-lived chunked body of `data: <json>` lines; the client
//! decodes it incrementally, turns each line into a [`StreamEvent`] and hands
//! it to the caller's callbacks. Exactly one terminal callback fires per run
//! unless the run is cancelled through the returned [`RunHandle`].
//!
//! ```no_run
//! use hedge_client::{AnalysisRequest, ClientConfig, ModelProvider, StreamingAnalysisClient};
//!
//! # async fn run() -> hedge_client::Result<()> {
//! let client = StreamingAnalysisClient::new(ClientConfig::default())?;
//! let request = AnalysisRequest::builder()
//!     .tickers(["AAPL", "NVDA"])
//!     .analysts(["warren_buffett", "technicals_analyst"])
//!     .model(ModelProvider::OpenAI, "gpt-4o")
//!     .build()?;
//!
//! let handle = client.start(
//!     &request,
//!     |update| println!("{update}"),
//!     |result| println!("{} decisions", result.decisions.len()),
//!     |message| eprintln!("run failed: {message}"),
//! );
//! let state = handle.wait().await;
//! println!("run {state}");
//! # Ok(())
//! # }
//! ```
//!
//! The remaining backend routes are wrapped by [`api::ApiClient`].

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod request;
pub mod stream;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::ApiClient;
pub use client::StreamingAnalysisClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, Result};
pub use event::{
    AnalystSignal, ProgressUpdate, RunResult, Signal, StreamEvent, TradeAction, TradingDecision,
    reasoning_text,
};
pub use request::{AnalysisRequest, AnalysisRequestBuilder, ModelProvider};
pub use stream::{Callbacks, RunHandle, RunObserver, RunStream, SessionState};
pub use transport::{ByteStream, ReqwestTransport, StreamRequest, Transport};
