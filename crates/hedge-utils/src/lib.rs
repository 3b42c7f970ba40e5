//! Shared utilities for hedge-rs
//!
//! Logging setup and application-level configuration used by the binaries
//! in this workspace. Library crates only emit `tracing` events; installing a
//! subscriber is left to the application.

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{Result, UtilsError};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
