//! Ollama API streaming client
//!
//! Implements [`ModelService`] over HTTP/1.1 streaming via reqwest:
//! - DELETE /api/delete
//! - POST /api/pull, /api/chat, /api/generate (newline-delimited JSON)
//! - GET /api/version for health checks

use crate::config::Config;
use crate::errors::{Result, StreamError};
use crate::service::{ChunkStream, ModelService};
use crate::streaming::parser::JsonParser;
use crate::types::{ChatChunk, ChatRequest, GenerateChunk, GenerateRequest, PullStatus};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Longest silence tolerated while waiting for headers or the next body read (5 minutes)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// TCP connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pulls of large models take much longer (1 hour)
const PULL_TIMEOUT: Duration = Duration::from_secs(3600);

/// Ollama streaming client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    idle_timeout: Duration,
    pull_timeout: Duration,
}

impl OllamaClient {
    /// Create new Ollama client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, REQUEST_TIMEOUT, PULL_TIMEOUT)
    }

    /// Create Ollama client with custom endpoint and timeouts.
    ///
    /// `request_timeout` bounds each wait for the server (response headers,
    /// then every body read), not the length of a stream. `pull_timeout`
    /// caps a whole pull.
    pub fn with_config(base_url: &str, request_timeout: Duration, pull_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .build()
            .map_err(StreamError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            idle_timeout: request_timeout,
            pull_timeout,
        })
    }

    /// Create Ollama client from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(
            &config.ollama_url(),
            Duration::from_secs(config.ollama.request_timeout_secs),
            Duration::from_secs(config.ollama.pull_timeout_secs),
        )
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).timeout(Duration::from_secs(2)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a non-success response to an error carrying the server's message
    async fn check_status(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StreamError::OllamaApiError(format!("HTTP {}: {}", status, error_text)))
    }

    /// Turn a streaming body into decoded chunks.
    ///
    /// The producer checks `cancel` before every network read and stops
    /// without yielding once it fires. A read that stays silent for longer
    /// than `idle_timeout` fails the stream.
    fn chunk_stream<T>(response: Response, idle_timeout: Duration, cancel: CancellationToken) -> ChunkStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut body = Box::pin(response.bytes_stream());

        Box::pin(async_stream::try_stream! {
            let mut parser = JsonParser::new();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("producer observed cancellation");
                        break;
                    }
                    next = tokio::time::timeout(idle_timeout, body.next()) => next,
                };

                let next = next.map_err(|_| {
                    warn!(idle = ?idle_timeout, "response body went silent");
                    StreamError::StreamingError(format!("No data received for {:?}", idle_timeout))
                })?;
                let Some(bytes) = next else { break };
                let bytes = bytes.map_err(|e| StreamError::StreamingError(e.to_string()))?;

                for json in parser.add_bytes(&bytes)? {
                    let chunk = JsonParser::decode::<T>(&json).map_err(|e| {
                        match &e {
                            StreamError::OllamaApiError(_) => warn!(error = %e, "service reported a mid-stream fault"),
                            _ => warn!(error = %e, "undecodable chunk"),
                        }
                        e
                    })?;
                    yield chunk;
                }
            }

            if !cancel.is_cancelled() {
                parser.finish()?;
            }
        })
    }

    async fn post_stream<T>(
        &self,
        path: &str,
        body: serde_json::Value,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<ChunkStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "opening streaming request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            response = tokio::time::timeout(self.idle_timeout, request.send()) => response
                .map_err(|_| StreamError::OllamaApiError(format!("No response within {:?}", self.idle_timeout)))?
                .map_err(|e| StreamError::OllamaApiError(format!("Failed to send request: {}", e)))?,
        };

        let response = Self::check_status(response).await?;
        Ok(Self::chunk_stream(response, self.idle_timeout, cancel))
    }
}

#[async_trait]
impl ModelService for OllamaClient {
    async fn delete_model(&self, name: &str, cancel: CancellationToken) -> Result<()> {
        let url = format!("{}/api/delete", self.base_url);
        let request = self
            .client
            .delete(&url)
            .timeout(self.idle_timeout)
            .json(&json!({ "name": name }))
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            response = request => response.map_err(|e| {
                StreamError::OllamaApiError(format!("Failed to connect to Ollama: {}", e))
            })?,
        };

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StreamError::ModelNotFound(name.to_string()));
        }
        Self::check_status(response).await?;

        debug!(model = name, "model deleted");
        Ok(())
    }

    async fn pull_model(&self, name: &str, cancel: CancellationToken) -> Result<ChunkStream<PullStatus>> {
        let body = json!({ "name": name, "stream": true });
        self.post_stream("/api/pull", body, Some(self.pull_timeout), cancel).await
    }

    async fn chat(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ChunkStream<ChatChunk>> {
        let body = serde_json::to_value(&request)?;
        self.post_stream("/api/chat", body, None, cancel).await
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<ChunkStream<GenerateChunk>> {
        let body = serde_json::to_value(&request)?;
        self.post_stream("/api/generate", body, None, cancel).await
    }
}
