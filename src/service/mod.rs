//! Model service boundary
//!
//! The adapters consume a model server only through [`ModelService`]: one
//! single-shot call (delete) and three streaming calls. Each streaming call
//! resolves once the server has accepted the request, then yields chunks
//! lazily as they arrive.

pub mod chat;

pub use chat::Chat;

use crate::errors::Result;
use crate::types::{ChatChunk, ChatRequest, GenerateChunk, GenerateRequest, PullStatus};
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Lazy, single-pass, ordered sequence of chunks
pub type ChunkStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Operations a model server exposes to the streaming adapters.
///
/// Implementations should stop producing chunks once `cancel` fires; the
/// adapters also stop polling, so a producer that ignores the token is simply
/// dropped.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Remove a local model
    async fn delete_model(&self, name: &str, cancel: CancellationToken) -> Result<()>;

    /// Download a model, streaming progress
    async fn pull_model(&self, name: &str, cancel: CancellationToken) -> Result<ChunkStream<PullStatus>>;

    /// Stream a chat completion
    async fn chat(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ChunkStream<ChatChunk>>;

    /// Stream a text generation
    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream<GenerateChunk>>;
}
