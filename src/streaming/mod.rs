//! Ollama HTTP service
//!
//! Provides the reqwest-backed [`OllamaClient`] and the incremental JSON
//! parser that frames its newline-delimited responses.

pub mod client;
pub mod parser;

pub use client::{OllamaClient, DEFAULT_OLLAMA_URL};
pub use parser::{JsonParser, MAX_BUFFER_SIZE};
