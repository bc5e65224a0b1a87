//! Stateful chat session over [`ModelService::chat`]
//!
//! A `Chat` owns the message history for one conversation. Each call to
//! [`Chat::send_message`] sends the whole history plus the new user message
//! and streams back the assistant's text fragments.

use crate::errors::{Result, StreamError};
use crate::service::{ChunkStream, ModelService};
use crate::types::{ChatRequest, Message, ModelOptions, Role};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Chat session handle
pub struct Chat<S> {
    service: Arc<S>,
    model: String,
    options: ModelOptions,
    history: Arc<Mutex<Vec<Message>>>,
}

impl<S> Clone for Chat<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            model: self.model.clone(),
            options: self.options.clone(),
            history: Arc::clone(&self.history),
        }
    }
}

impl<S: ModelService + 'static> Chat<S> {
    /// Start an empty conversation with `model`
    pub fn new(service: Arc<S>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            options: ModelOptions::default(),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed the conversation with a system prompt
    pub fn with_system(self, prompt: impl Into<String>) -> Self {
        let history = vec![Message::system(prompt)];
        Self {
            history: Arc::new(Mutex::new(history)),
            ..self
        }
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Snapshot of the conversation so far
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Forget all turns, keeping a leading system prompt if there is one
    pub async fn clear(&self) {
        self.history.lock().await.retain(|m| m.role == Role::System);
    }

    /// Send a user message and stream the assistant's reply.
    ///
    /// The user message is recorded before this returns, whether or not the
    /// stream is ever polled. The assembled assistant reply is recorded only
    /// when the stream runs to completion without error or cancellation.
    pub async fn send_message(
        &self,
        message: impl Into<String>,
        images: Vec<Vec<u8>>,
        cancel: CancellationToken,
    ) -> ChunkStream<String> {
        let images: Vec<String> = images.iter().map(|bytes| STANDARD.encode(bytes)).collect();
        let user = Message::user(message).with_images(images);
        let messages = {
            let mut history = self.history.lock().await;
            history.push(user);
            history.clone()
        };

        let service = Arc::clone(&self.service);
        let history = Arc::clone(&self.history);
        let model = self.model.clone();
        let options = self.options.clone();

        Box::pin(async_stream::try_stream! {
            debug!(model = %model, turns = messages.len(), "sending chat message");
            let request = ChatRequest::new(model, messages).with_options(options);
            let mut chunks = service.chat(request, cancel.clone()).await?;

            let mut reply = String::new();
            while let Some(chunk) = chunks.next().await {
                if cancel.is_cancelled() {
                    Err::<(), StreamError>(StreamError::Cancelled)?;
                }
                if let Some(text) = chunk?.content() {
                    reply.push_str(&text);
                    yield text;
                }
            }

            if cancel.is_cancelled() {
                Err::<(), StreamError>(StreamError::Cancelled)?;
            }

            history.lock().await.push(Message::assistant(reply));
        })
    }

    /// Send a message and collect the full reply text
    pub async fn ask(&self, message: impl Into<String>, cancel: CancellationToken) -> Result<String> {
        let mut stream = self.send_message(message, Vec::new(), cancel).await;
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            reply.push_str(&fragment?);
        }
        Ok(reply)
    }
}
