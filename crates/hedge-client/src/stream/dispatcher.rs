//! Event dispatch and the terminal-state policy

use super::observer::RunObserver;
use super::session::SessionState;
use crate::event::StreamEvent;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Whether the read loop keeps going after a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop(SessionState),
}

/// Routes decoded events to the observer.
///
/// Once an outcome is recorded (completed, failed or cancelled) every later
/// event is dropped without reaching the observer.
pub(crate) struct Dispatcher<O> {
    observer: O,
    cancel: CancellationToken,
    outcome: Option<SessionState>,
    progress_count: usize,
}

impl<O: RunObserver> Dispatcher<O> {
    pub(crate) fn new(observer: O, cancel: CancellationToken) -> Self {
        Self {
            observer,
            cancel,
            outcome: None,
            progress_count: 0,
        }
    }

    pub(crate) async fn dispatch(&mut self, event: StreamEvent) -> Flow {
        if let Some(state) = self.outcome {
            debug!("Dropping event after run ended as {}", state);
            return Flow::Stop(state);
        }
        if self.cancel.is_cancelled() {
            return Flow::Stop(self.cancelled());
        }

        match event {
            StreamEvent::Progress(update) => {
                self.progress_count += 1;
                debug!("Progress #{}: {}", self.progress_count, update);
                self.observer.on_progress(update).await;
                Flow::Continue
            }
            StreamEvent::Complete(result) => {
                self.outcome = Some(SessionState::Completed);
                info!(
                    "Run completed after {} progress events: {} decisions",
                    self.progress_count,
                    result.decisions.len()
                );
                self.observer.on_complete(result).await;
                Flow::Stop(SessionState::Completed)
            }
            StreamEvent::Error(message) => {
                self.outcome = Some(SessionState::Failed);
                info!("Run failed: {}", message);
                self.observer.on_error(message).await;
                Flow::Stop(SessionState::Failed)
            }
        }
    }

    /// Report a client-side failure (transport error, unexpected end)
    pub(crate) async fn fail(&mut self, message: impl Into<String>) -> SessionState {
        match self.dispatch(StreamEvent::Error(message.into())).await {
            Flow::Stop(state) => state,
            Flow::Continue => SessionState::Failed,
        }
    }

    /// Record cancellation; no callback is invoked
    pub(crate) fn cancelled(&mut self) -> SessionState {
        *self.outcome.get_or_insert_with(|| {
            debug!("Run cancelled, suppressing further callbacks");
            SessionState::Canceled
        })
    }

    pub(crate) fn progress_count(&self) -> usize {
        self.progress_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ProgressUpdate, RunResult};
    use crate::stream::observer::ChannelObserver;
    use tokio::sync::mpsc;

    fn progress() -> StreamEvent {
        StreamEvent::Progress(ProgressUpdate {
            agent: "valuation_agent".to_string(),
            ticker: Some("JPM".to_string()),
            status: "Done".to_string(),
            timestamp: None,
        })
    }

    fn dispatcher() -> (
        Dispatcher<ChannelObserver>,
        CancellationToken,
        mpsc::UnboundedReceiver<StreamEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        (
            Dispatcher::new(ChannelObserver::new(tx), cancel.clone()),
            cancel,
            rx,
        )
    }

    #[tokio::test]
    async fn test_terminal_event_is_absorbing() {
        let (mut dispatcher, _cancel, mut rx) = dispatcher();

        assert_eq!(dispatcher.dispatch(progress()).await, Flow::Continue);
        assert_eq!(
            dispatcher
                .dispatch(StreamEvent::Complete(RunResult::default()))
                .await,
            Flow::Stop(SessionState::Completed)
        );
        assert_eq!(
            dispatcher.dispatch(StreamEvent::Error("late".into())).await,
            Flow::Stop(SessionState::Completed)
        );
        assert_eq!(dispatcher.fail("later").await, SessionState::Completed);
        assert_eq!(dispatcher.dispatch(progress()).await, Flow::Stop(SessionState::Completed));
        drop(dispatcher);

        assert!(matches!(rx.recv().await, Some(StreamEvent::Progress(_))));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Complete(_))));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancellation_suppresses_dispatch() {
        let (mut dispatcher, cancel, mut rx) = dispatcher();

        dispatcher.dispatch(progress()).await;
        cancel.cancel();

        assert_eq!(
            dispatcher
                .dispatch(StreamEvent::Complete(RunResult::default()))
                .await,
            Flow::Stop(SessionState::Canceled)
        );
        assert_eq!(dispatcher.fail("transport closed").await, SessionState::Canceled);
        assert_eq!(dispatcher.progress_count(), 1);
        drop(dispatcher);

        assert!(matches!(rx.recv().await, Some(StreamEvent::Progress(_))));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_fail_reports_error_once() {
        let (mut dispatcher, _cancel, mut rx) = dispatcher();

        assert_eq!(dispatcher.fail("connection refused").await, SessionState::Failed);
        assert_eq!(dispatcher.cancelled(), SessionState::Failed);
        drop(dispatcher);

        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Error("connection refused".to_string()))
        );
        assert_eq!(rx.recv().await, None);
    }
}
