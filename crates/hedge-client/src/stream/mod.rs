//! Streaming pipeline
//!
//! Bytes from the [`Transport`](crate::transport::Transport) flow through
//! [`Utf8Decoder`] and [`LineFramer`], each line is classified by
//! [`parse_line`], and events reach a [`RunObserver`] through a dispatcher
//! that enforces the terminal-state and cancellation rules.

mod decoder;
mod dispatcher;
mod frame;
mod framer;
mod handle;
mod observer;
mod session;

pub use decoder::Utf8Decoder;
pub use frame::{DATA_PREFIX, DEFAULT_ERROR_MESSAGE, Frame, parse_line};
pub use framer::{LineFramer, split_lines};
pub use handle::{RunHandle, RunStream};
pub use observer::{Callbacks, ChannelObserver, RunObserver};
pub use session::{SessionState, UNEXPECTED_END_MESSAGE};

pub(crate) use session::StreamSession;
