//! Progress chunks streamed while pulling a model
//!
//! Each line of a `/api/pull` response is one `PullStatus`. Layer downloads
//! report `total`/`completed`; the final chunk has status `success`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress update during model pull operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullStatus {
    /// Status message (e.g. "pulling manifest", "verifying sha256 digest")
    pub status: String,

    /// Digest of the layer being pulled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Total bytes to download for this layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Bytes completed for this layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,
}

impl PullStatus {
    /// Create a status-only chunk
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            digest: None,
            total: None,
            completed: None,
        }
    }

    /// Attach layer progress
    pub fn with_progress(mut self, digest: impl Into<String>, completed: u64, total: u64) -> Self {
        self.digest = Some(digest.into());
        self.completed = Some(completed);
        self.total = Some(total);
        self
    }

    /// Download percentage of the current layer, if known
    pub fn percent(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                Some((completed as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }

    /// True for the terminal chunk of a successful pull
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

impl fmt::Display for PullStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) => write!(
                f,
                "{} ({} / {})",
                self.status,
                format_size(completed),
                format_size(total)
            ),
            _ => write!(f, "{}", self.status),
        }
    }
}

/// Format bytes into human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let size = bytes as f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}
