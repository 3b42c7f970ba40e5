//! One streaming run: transport → UTF-8 decoder → line framer → frames → dispatcher

use super::decoder::Utf8Decoder;
use super::dispatcher::{Dispatcher, Flow};
use super::frame::{Frame, parse_line};
use super::framer::LineFramer;
use super::observer::RunObserver;
use crate::error::{ClientError, Result};
use crate::transport::{StreamRequest, Transport};
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reported when the body ends before any terminal frame
pub const UNEXPECTED_END_MESSAGE: &str = "Stream ended unexpectedly without a result";

/// Lifecycle of a run. `Completed`, `Failed` and `Canceled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Streaming,
    Completed,
    Failed,
    Canceled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Owns the decode/frame state of one run and publishes its lifecycle
pub(crate) struct StreamSession {
    decoder: Utf8Decoder,
    framer: LineFramer,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
    chunk_count: usize,
    byte_count: usize,
}

impl StreamSession {
    pub(crate) fn new(cancel: CancellationToken, state: watch::Sender<SessionState>) -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            framer: LineFramer::new(),
            cancel,
            state,
            chunk_count: 0,
            byte_count: 0,
        }
    }

    /// Drive the run to a final state. Transport and payload errors are
    /// routed through the observer; a panicking observer ends the run as
    /// `Failed` with no further callbacks.
    pub(crate) async fn run<T, O>(
        mut self,
        transport: &T,
        request: Result<StreamRequest>,
        observer: O,
    ) -> SessionState
    where
        T: Transport + ?Sized,
        O: RunObserver,
    {
        let started = Instant::now();
        self.state.send_replace(SessionState::Streaming);

        let mut dispatcher = Dispatcher::new(observer, self.cancel.clone());
        let driven = AssertUnwindSafe(self.drive(transport, request, &mut dispatcher))
            .catch_unwind()
            .await;
        let state = driven.unwrap_or_else(|_| {
            error!("Run observer panicked, abandoning stream");
            SessionState::Failed
        });

        info!(
            "Stream session {} in {:.2?} ({} chunks, {} bytes, {} progress events)",
            state,
            started.elapsed(),
            self.chunk_count,
            self.byte_count,
            dispatcher.progress_count()
        );
        self.state.send_replace(state);
        state
    }

    async fn drive<T, O>(
        &mut self,
        transport: &T,
        request: Result<StreamRequest>,
        dispatcher: &mut Dispatcher<O>,
    ) -> SessionState
    where
        T: Transport + ?Sized,
        O: RunObserver,
    {
        let request = match request {
            Ok(request) => request,
            Err(e) => return dispatcher.fail(e.to_string()).await,
        };

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return dispatcher.cancelled(),
            opened = transport.open(request, self.cancel.clone()) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(ClientError::Cancelled) => return dispatcher.cancelled(),
            Err(e) => {
                warn!("Failed to open stream: {}", e);
                return dispatcher.fail(e.to_string()).await;
            }
        };

        // Dropping `body` on any return below releases the connection
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return dispatcher.cancelled(),
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    self.chunk_count += 1;
                    self.byte_count += chunk.len();
                    let text = self.decoder.decode(&chunk);
                    for line in self.framer.push(&text) {
                        if let Flow::Stop(state) = handle_line(&line, dispatcher).await {
                            return state;
                        }
                    }
                }
                Some(Err(ClientError::Cancelled)) => return dispatcher.cancelled(),
                Some(Err(e)) => {
                    warn!("Stream interrupted after {} chunks: {}", self.chunk_count, e);
                    return dispatcher.fail(format!("Stream interrupted: {}", e)).await;
                }
                None => return self.finish(dispatcher).await,
            }
        }
    }

    /// Body ended: flush what is buffered, then report the missing result
    async fn finish<O: RunObserver>(&mut self, dispatcher: &mut Dispatcher<O>) -> SessionState {
        let tail = self.decoder.finish();
        let mut lines = self.framer.push(&tail);
        lines.extend(self.framer.take_remainder());

        for line in lines {
            if let Flow::Stop(state) = handle_line(&line, dispatcher).await {
                return state;
            }
        }

        warn!("Stream closed without a complete or error event");
        dispatcher.fail(UNEXPECTED_END_MESSAGE).await
    }
}

async fn handle_line<O: RunObserver>(line: &str, dispatcher: &mut Dispatcher<O>) -> Flow {
    match parse_line(line) {
        Frame::Ignored => Flow::Continue,
        Frame::Malformed { payload, reason } => {
            warn!("Skipping malformed frame ({}): {}", reason, payload);
            Flow::Continue
        }
        Frame::Unknown { kind } => {
            debug!("Skipping frame of unhandled type {:?}", kind);
            Flow::Continue
        }
        Frame::Event(event) => dispatcher.dispatch(event).await,
    }
}
