//! Callback contracts for a run

use crate::event::{ProgressUpdate, RunResult, StreamEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receives the events of one run.
///
/// The session guarantees `on_progress` is only called before any terminal
/// callback, and that at most one of `on_complete` / `on_error` is called,
/// at most once. Nothing is called after the run is cancelled.
#[async_trait]
pub trait RunObserver: Send + 'static {
    async fn on_progress(&mut self, update: ProgressUpdate);

    async fn on_complete(&mut self, result: RunResult);

    async fn on_error(&mut self, message: String);
}

/// Adapts three plain closures to [`RunObserver`].
///
/// The terminal closures are `FnOnce`; whichever fires first consumes both.
pub struct Callbacks<P, C, E> {
    on_progress: P,
    terminal: Option<(C, E)>,
}

impl<P, C, E> Callbacks<P, C, E>
where
    P: FnMut(ProgressUpdate) + Send + 'static,
    C: FnOnce(RunResult) + Send + 'static,
    E: FnOnce(String) + Send + 'static,
{
    pub fn new(on_progress: P, on_complete: C, on_error: E) -> Self {
        Self {
            on_progress,
            terminal: Some((on_complete, on_error)),
        }
    }
}

#[async_trait]
impl<P, C, E> RunObserver for Callbacks<P, C, E>
where
    P: FnMut(ProgressUpdate) + Send + 'static,
    C: FnOnce(RunResult) + Send + 'static,
    E: FnOnce(String) + Send + 'static,
{
    async fn on_progress(&mut self, update: ProgressUpdate) {
        if self.terminal.is_some() {
            (self.on_progress)(update);
        }
    }

    async fn on_complete(&mut self, result: RunResult) {
        if let Some((on_complete, _)) = self.terminal.take() {
            on_complete(result);
        }
    }

    async fn on_error(&mut self, message: String) {
        if let Some((_, on_error)) = self.terminal.take() {
            on_error(message);
        }
    }
}

/// Forwards every event into a channel; backs [`super::RunStream`].
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: StreamEvent) {
        // Receiver gone means the consumer stopped listening
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl RunObserver for ChannelObserver {
    async fn on_progress(&mut self, update: ProgressUpdate) {
        self.forward(StreamEvent::Progress(update));
    }

    async fn on_complete(&mut self, result: RunResult) {
        self.forward(StreamEvent::Complete(result));
    }

    async fn on_error(&mut self, message: String) {
        self.forward(StreamEvent::Error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn update(status: &str) -> ProgressUpdate {
        ProgressUpdate {
            agent: "fundamentals_agent".to_string(),
            ticker: Some("AAPL".to_string()),
            status: status.to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_callbacks_fire_terminal_once() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (p, c, e) = (log.clone(), log.clone(), log.clone());

        let mut callbacks = Callbacks::new(
            move |u: ProgressUpdate| p.lock().unwrap().push(format!("progress:{}", u.status)),
            move |_r: RunResult| c.lock().unwrap().push("complete".to_string()),
            move |m: String| e.lock().unwrap().push(format!("error:{m}")),
        );

        callbacks.on_progress(update("start")).await;
        callbacks.on_complete(RunResult::default()).await;
        callbacks.on_error("late".to_string()).await;
        callbacks.on_progress(update("late")).await;

        assert_eq!(*log.lock().unwrap(), vec!["progress:start", "complete"]);
    }

    #[tokio::test]
    async fn test_channel_observer_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut observer = ChannelObserver::new(tx);

        observer.on_progress(update("working")).await;
        observer.on_error("failed".to_string()).await;

        assert!(matches!(rx.recv().await, Some(StreamEvent::Progress(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::Error("failed".to_string())));
    }
}
