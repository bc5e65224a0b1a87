//! Chat request and response chunk types for `/api/chat`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::ModelOptions;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    /// Text content; absent in some streamed chunks (e.g. the final `done` chunk)
    #[serde(default)]
    pub content: String,

    /// Base64-encoded images for multimodal models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach already-encoded images
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = if images.is_empty() { None } else { Some(images) };
        self
    }
}

/// Body of a streaming `/api/chat` call
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,

    /// Response format, e.g. "json"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "ModelOptions::is_empty")]
    pub options: ModelOptions,

    /// How long the model stays loaded after the request, e.g. "5m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            format: None,
            options: ModelOptions::default(),
            keep_alive: None,
        }
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// One streamed line of a `/api/chat` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
}

impl ChatChunk {
    /// Text carried by this chunk, `None` when the message or its content is empty
    pub fn content(self) -> Option<String> {
        self.message
            .map(|message| message.content)
            .filter(|content| !content.is_empty())
    }
}
