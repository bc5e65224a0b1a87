//! Generate request and response chunk types for `/api/generate`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::ModelOptions;

/// Token state returned by the final generate chunk. Passing it back with
/// the next prompt continues the same conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationContext(pub Vec<i64>);

impl ConversationContext {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body of a streaming `/api/generate` call
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ConversationContext>,

    /// Base64-encoded images
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(skip_serializing_if = "ModelOptions::is_empty")]
    pub options: ModelOptions,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
            system: None,
            context: None,
            images: Vec::new(),
            options: ModelOptions::default(),
            keep_alive: None,
        }
    }

    /// Continue from a previous generation; an empty context is ignored
    pub fn with_context(mut self, context: Option<ConversationContext>) -> Self {
        self.context = context.filter(|c| !c.is_empty());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }
}

/// One streamed line of a `/api/generate` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Only present on the final chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ConversationContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
}

impl GenerateChunk {
    /// Response text of this chunk, `None` when absent or empty
    pub fn text(self) -> Option<String> {
        self.response.filter(|text| !text.is_empty())
    }
}
