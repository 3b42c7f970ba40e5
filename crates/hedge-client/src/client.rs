//! Streaming analysis client

use crate::config::ClientConfig;
use crate::error::Result;
use crate::event::{ProgressUpdate, RunResult};
use crate::request::AnalysisRequest;
use crate::stream::{
    Callbacks, ChannelObserver, RunHandle, RunObserver, RunStream, SessionState, StreamSession,
};
use crate::transport::{ReqwestTransport, StreamRequest, Transport};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

/// Starts analysis runs against the hedge fund service.
///
/// Each run executes on its own tokio task; the client itself holds no
/// per-run state and can start any number of concurrent runs.
pub struct StreamingAnalysisClient<T: Transport = ReqwestTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    run_url: Url,
}

impl<T: Transport> Clone for StreamingAnalysisClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
            run_url: self.run_url.clone(),
        }
    }
}

impl StreamingAnalysisClient<ReqwestTransport> {
    /// Create a client over HTTP
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config)?;
        Self::with_transport(config, transport)
    }

    /// Create a client from `HEDGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> StreamingAnalysisClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let run_url = config.run_url()?;
        Ok(Self {
            transport: Arc::new(transport),
            config,
            run_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a run and report through three callbacks.
    ///
    /// `on_progress` fires for each progress event in arrival order. Exactly
    /// one of `on_complete` / `on_error` fires at most once, unless the run
    /// is cancelled through the returned handle, in which case neither does.
    /// Must be called from within a tokio runtime.
    pub fn start<P, C, E>(
        &self,
        request: &AnalysisRequest,
        on_progress: P,
        on_complete: C,
        on_error: E,
    ) -> RunHandle
    where
        P: FnMut(ProgressUpdate) + Send + 'static,
        C: FnOnce(RunResult) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.start_with_observer(request, Callbacks::new(on_progress, on_complete, on_error))
    }

    /// Start a run reporting to any [`RunObserver`]
    pub fn start_with_observer<O: RunObserver>(
        &self,
        request: &AnalysisRequest,
        observer: O,
    ) -> RunHandle {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let handle = RunHandle::new(cancel.clone(), state_rx);

        info!(
            "Starting analysis of {} with {} analysts on {}/{}",
            request.tickers().join(","),
            request.analysts().len(),
            request.model_provider(),
            request.model_name()
        );

        let stream_request = self.stream_request(request);
        let session = StreamSession::new(cancel, state_tx);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            session
                .run(transport.as_ref(), stream_request, observer)
                .await
        });

        handle
    }

    /// Start a run and consume its events as a stream
    pub fn events(&self, request: &AnalysisRequest) -> RunStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.start_with_observer(request, ChannelObserver::new(tx));
        RunStream::new(rx, handle)
    }

    // The builder already enforced the request invariants
    fn stream_request(&self, request: &AnalysisRequest) -> Result<StreamRequest> {
        let body = serde_json::to_value(request)?;
        Ok(StreamRequest::post_json(self.run_url.clone(), body))
    }
}
