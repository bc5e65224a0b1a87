//! ollamastream - callback adapters for streaming Ollama calls
//!
//! Pulls, chats and generations arrive as chunk streams. This crate lets a
//! caller observe every chunk through a callback while still receiving the
//! full ordered result at the end, as one cancellable background task.
//!
//! # Architecture
//!
//! - **service**: the [`ModelService`] boundary and the [`Chat`] session
//! - **streaming**: the reqwest-backed [`OllamaClient`] implementation
//! - **adapter**: projection, draining, executors and [`CallbackClient`]

pub mod errors;
pub mod types;
pub mod config;
pub mod service;
pub mod streaming;
pub mod adapter;
pub mod cli;

// Re-export commonly used types
pub use errors::{Result, StreamError};
pub use config::Config;
pub use service::{Chat, ChunkStream, ModelService};
pub use streaming::OllamaClient;
pub use adapter::{CallbackClient, InlineExecutor, StreamTask, StreamingAdapter, Task, TokioExecutor};
