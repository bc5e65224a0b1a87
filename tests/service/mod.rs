//! Scripted in-memory model service shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ollamastream::types::{ChatChunk, ChatRequest, GenerateChunk, GenerateRequest, Message, PullStatus};
use ollamastream::{ChunkStream, ModelService, Result, StreamError};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One step of a scripted stream
#[derive(Debug, Clone)]
pub enum Step<T> {
    Chunk(T),
    Fail(String),
    /// Never produces another chunk
    Hang,
}

fn scripted<T: Send + 'static>(steps: Vec<Step<T>>) -> ChunkStream<T> {
    Box::pin(async_stream::stream! {
        for step in steps {
            match step {
                Step::Chunk(chunk) => yield Ok(chunk),
                Step::Fail(msg) => {
                    yield Err(StreamError::StreamingError(msg));
                    return;
                }
                Step::Hang => futures_util::future::pending::<()>().await,
            }
        }
    })
}

#[derive(Default)]
pub struct ScriptedService {
    pub pull: Vec<Step<PullStatus>>,
    pub chat: Vec<Step<ChatChunk>>,
    pub generate: Vec<Step<GenerateChunk>>,
    /// Tokens handed to the producer, to check cancellation reaches it
    pub tokens: Mutex<Vec<CancellationToken>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedService {
    fn record(&self, cancel: &CancellationToken) {
        self.tokens.lock().unwrap().push(cancel.clone());
    }
}

pub fn chat_chunk(content: Option<&str>) -> ChatChunk {
    ChatChunk {
        model: "llama3.1:8b".to_string(),
        message: content.map(Message::assistant),
        ..Default::default()
    }
}

pub fn generate_chunk(response: &str) -> GenerateChunk {
    GenerateChunk {
        model: "llama3.1:8b".to_string(),
        response: Some(response.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ModelService for ScriptedService {
    async fn delete_model(&self, name: &str, cancel: CancellationToken) -> Result<()> {
        self.record(&cancel);
        match name {
            "missing" => Err(StreamError::ModelNotFound(name.to_string())),
            "slow" => {
                cancel.cancelled().await;
                Err(StreamError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    async fn pull_model(&self, _name: &str, cancel: CancellationToken) -> Result<ChunkStream<PullStatus>> {
        self.record(&cancel);
        Ok(scripted(self.pull.clone()))
    }

    async fn chat(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ChunkStream<ChatChunk>> {
        self.record(&cancel);
        self.chat_requests.lock().unwrap().push(request);
        Ok(scripted(self.chat.clone()))
    }

    async fn generate(
        &self,
        _request: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream<GenerateChunk>> {
        self.record(&cancel);
        Ok(scripted(self.generate.clone()))
    }
}
