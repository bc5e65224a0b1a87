//! Callback-style facade over a [`ModelService`]
//!
//! Every streaming call takes a per-chunk callback and returns a task that
//! resolves to everything the callback saw, in order. The service is held by
//! `Arc` and never modified.

use crate::adapter::aggregate::StreamingAdapter;
use crate::adapter::executor::{Executor, StreamTask, Task, TokioExecutor};
use crate::errors::Result;
use crate::service::{Chat, ModelService};
use crate::types::{ChatChunk, ChatRequest, ConversationContext, GenerateChunk, GenerateRequest, PullStatus};
use std::future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Model used when a call does not name one
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

pub struct CallbackClient<S, E = TokioExecutor> {
    service: Arc<S>,
    adapter: StreamingAdapter<E>,
    default_model: String,
}

impl<S: ModelService + 'static> CallbackClient<S, TokioExecutor> {
    /// Client whose tasks are spawned on the current Tokio runtime
    pub fn new(service: Arc<S>) -> Result<Self> {
        Ok(Self::with_executor(service, TokioExecutor::current()?))
    }
}

impl<S: ModelService + 'static, E: Executor> CallbackClient<S, E> {
    pub fn with_executor(service: Arc<S>, executor: E) -> Self {
        Self {
            service,
            adapter: StreamingAdapter::new(executor),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Delete a model. Not streamed; shares only the task convention.
    pub fn delete_model(&self, name: impl Into<String>, cancel: &CancellationToken) -> Task<()> {
        let service = Arc::clone(&self.service);
        let name = name.into();
        let token = cancel.child_token();
        let producer_token = token.clone();

        self.adapter.run(
            async move { service.delete_model(&name, producer_token).await },
            token,
        )
    }

    /// Pull a model, surfacing every raw progress chunk
    pub fn pull_model<C>(&self, name: impl Into<String>, on_chunk: C, cancel: &CancellationToken) -> StreamTask<PullStatus>
    where
        C: FnMut(&PullStatus) -> Result<()> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let name = name.into();
        let token = cancel.child_token();
        let producer_token = token.clone();

        self.adapter.run_streaming(
            async move { service.pull_model(&name, producer_token).await },
            on_chunk,
            Some,
            token,
        )
    }

    /// Stream a chat completion, surfacing the text of each chunk that has any
    pub fn chat<C>(&self, request: ChatRequest, on_chunk: C, cancel: &CancellationToken) -> StreamTask<String>
    where
        C: FnMut(&String) -> Result<()> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let token = cancel.child_token();
        let producer_token = token.clone();

        self.adapter.run_streaming(
            async move { service.chat(request, producer_token).await },
            on_chunk,
            ChatChunk::content,
            token,
        )
    }

    /// Stream a generation, surfacing each non-empty response fragment
    pub fn generate<C>(&self, request: GenerateRequest, on_chunk: C, cancel: &CancellationToken) -> StreamTask<String>
    where
        C: FnMut(&String) -> Result<()> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let token = cancel.child_token();
        let producer_token = token.clone();

        self.adapter.run_streaming(
            async move { service.generate(request, producer_token).await },
            on_chunk,
            GenerateChunk::text,
            token,
        )
    }

    /// Generate from a bare prompt with the default model, optionally
    /// continuing an earlier conversation
    pub fn generate_prompt<C>(
        &self,
        prompt: impl Into<String>,
        context: Option<ConversationContext>,
        on_chunk: C,
        cancel: &CancellationToken,
    ) -> StreamTask<String>
    where
        C: FnMut(&String) -> Result<()> + Send + 'static,
    {
        let request = GenerateRequest::new(self.default_model.clone(), prompt).with_context(context);
        self.generate(request, on_chunk, cancel)
    }

    /// Send a message within a chat session, surfacing each reply fragment.
    ///
    /// The user turn is in the session history once this resolves to a
    /// task, even if that task is cancelled before it runs.
    pub async fn send_message<C>(
        &self,
        chat: &Chat<S>,
        message: impl Into<String>,
        images: Vec<Vec<u8>>,
        on_chunk: C,
        cancel: &CancellationToken,
    ) -> StreamTask<String>
    where
        C: FnMut(&String) -> Result<()> + Send + 'static,
    {
        let token = cancel.child_token();
        let fragments = chat.send_message(message, images, token.clone()).await;

        self.adapter.run_streaming(future::ready(Ok(fragments)), on_chunk, Some, token)
    }

    /// New chat session on the default model
    pub fn chat_session(&self) -> Chat<S> {
        Chat::new(Arc::clone(&self.service), self.default_model.clone())
    }
}
