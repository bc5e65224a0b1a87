//! Sampling and runtime options forwarded to the model

use serde::{Deserialize, Serialize};

/// Model parameters sent in the `options` object of chat/generate requests.
/// Unset fields are omitted so the server applies the model's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Context window size in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,

    /// Maximum number of tokens to predict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ModelOptions {
    pub fn is_empty(&self) -> bool {
        self == &ModelOptions::default()
    }
}
