//! Caller-facing handles for a running analysis

use super::session::SessionState;
use crate::event::StreamEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancels and observes one run. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RunHandle {
    token: CancellationToken,
    state: watch::Receiver<SessionState>,
}

impl RunHandle {
    pub(crate) fn new(token: CancellationToken, state: watch::Receiver<SessionState>) -> Self {
        Self { token, state }
    }

    /// Stop the run. No callback fires afterwards, not even `on_error`.
    ///
    /// Idempotent, and a no-op once the run has reached a final state.
    pub fn cancel(&self) {
        let state = self.state();
        if state.is_terminal() {
            debug!("Cancel ignored, run already {}", state);
            return;
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the run reaches a final state
    pub async fn wait(&self) -> SessionState {
        let mut state = self.state.clone();
        let waited = state.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        match waited {
            Ok(final_state) => final_state,
            // Session task went away without publishing a final state
            Err(_) => {
                let last = *state.borrow();
                if last.is_terminal() {
                    last
                } else {
                    SessionState::Canceled
                }
            }
        }
    }
}

/// Events of one run as a [`Stream`].
///
/// Ends after the terminal event. Cancelling, or dropping the stream,
/// cancels the run.
#[derive(Debug)]
pub struct RunStream {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    handle: RunHandle,
    done: bool,
}

impl RunStream {
    pub(crate) fn new(events: mpsc::UnboundedReceiver<StreamEvent>, handle: RunHandle) -> Self {
        Self {
            events,
            handle,
            done: false,
        }
    }

    pub fn handle(&self) -> &RunHandle {
        &self.handle
    }

    /// Cancel the run; the stream yields nothing further
    pub fn cancel(&mut self) {
        self.handle.cancel();
        self.done = true;
        self.events.close();
    }
}

impl Stream for RunStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        if self.done || self.handle.is_cancelled() {
            return Poll::Ready(None);
        }
        match self.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.done = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RunResult;
    use futures::StreamExt;

    fn handle() -> (RunHandle, watch::Sender<SessionState>, CancellationToken) {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(SessionState::Idle);
        (RunHandle::new(token.clone(), rx), tx, token)
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (handle, _tx, token) = handle();
        handle.cancel();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(handle.clone().is_cancelled());
    }

    #[test]
    fn test_cancel_after_terminal_is_noop() {
        let (handle, tx, token) = handle();
        tx.send_replace(SessionState::Completed);

        handle.cancel();
        assert!(!token.is_cancelled());
        assert_eq!(handle.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_wait_returns_final_state() {
        let (handle, tx, _token) = handle();
        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.wait().await }
        });

        tx.send_replace(SessionState::Streaming);
        tx.send_replace(SessionState::Failed);
        assert_eq!(waiter.await.unwrap(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_wait_when_session_vanishes() {
        let (handle, tx, _token) = handle();
        drop(tx);
        assert_eq!(handle.wait().await, SessionState::Canceled);
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal() {
        let (handle, _state, _token) = handle();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = RunStream::new(rx, handle);

        tx.send(StreamEvent::Complete(RunResult::default())).unwrap();
        tx.send(StreamEvent::Error("late".to_string())).unwrap();

        assert!(matches!(stream.next().await, Some(StreamEvent::Complete(_))));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_drop_cancels_run() {
        let (handle, _state, token) = handle();
        let (_tx, rx) = mpsc::unbounded_channel();
        let stream = RunStream::new(rx, handle);

        drop(stream);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_stream_yields_nothing() {
        let (handle, _state, _token) = handle();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = RunStream::new(rx, handle);

        tx.send(StreamEvent::Error("queued".to_string())).unwrap();
        stream.cancel();
        assert_eq!(stream.next().await, None);
    }
}
