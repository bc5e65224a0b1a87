//! Incremental JSON framing for newline-delimited streaming responses
//!
//! Ollama streams one JSON object per line, but network reads split those
//! objects at arbitrary byte offsets. The parser accumulates bytes and
//! extracts complete top-level objects by bracket matching:
//! - Buffer: 1MB maximum
//! - Algorithm: O(n) over the whole stream; scan state survives between reads
//! - Braces inside string literals (including escaped quotes) are ignored

use crate::errors::{Result, StreamError};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Maximum buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Error object the server emits in place of a chunk
#[derive(Debug, Deserialize)]
struct ServiceErrorLine {
    error: String,
}

/// Where the bracket scan stopped in the current buffer
#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    /// Next buffer index to examine
    pos: usize,
    depth: i32,
    start: Option<usize>,
    in_string: bool,
    escape_next: bool,
}

/// Incremental JSON parser
#[derive(Debug)]
pub struct JsonParser {
    /// Accumulation buffer
    buffer: Vec<u8>,

    /// Maximum buffer size
    max_buffer_size: usize,

    /// Progress of the scan for the object at the front of `buffer`
    scan: ScanState,
}

impl JsonParser {
    /// Create new JSON parser with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create parser with custom buffer capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
            scan: ScanState::default(),
        }
    }

    /// Add bytes and return every JSON object completed by them, in order
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(StreamError::JsonParseError(format!(
                "Buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut objects = Vec::new();
        while let Some(json) = self.try_extract_json()? {
            objects.push(json);
        }
        Ok(objects)
    }

    /// Extract the first complete JSON object from the buffer, if any
    fn try_extract_json(&mut self) -> Result<Option<String>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        if let Some((start, end)) = self.find_complete_json()? {
            let json_str = String::from_utf8_lossy(&self.buffer[start..=end]).to_string();
            self.buffer.drain(..=end);
            self.scan = ScanState::default();
            return Ok(Some(json_str));
        }

        Ok(None)
    }

    /// Bracket-matching scan, resumed from where the previous call stopped.
    ///
    /// Returns: Some((start_index, end_index)) or None
    fn find_complete_json(&mut self) -> Result<Option<(usize, usize)>> {
        let mut scan = self.scan;

        for i in scan.pos..self.buffer.len() {
            let byte = self.buffer[i];
            if scan.escape_next {
                scan.escape_next = false;
                continue;
            }

            match byte {
                b'\\' if scan.in_string => scan.escape_next = true,
                b'"' if scan.start.is_some() => scan.in_string = !scan.in_string,
                _ if scan.in_string => {}
                b'{' => {
                    if scan.depth == 0 {
                        scan.start = Some(i);
                    }
                    scan.depth += 1;
                }
                b'}' => {
                    scan.depth -= 1;
                    if scan.depth < 0 {
                        return Err(StreamError::JsonParseError(
                            "Mismatched braces: too many closing braces".to_string(),
                        ));
                    }
                    if scan.depth == 0 {
                        if let Some(start) = scan.start {
                            return Ok(Some((start, i)));
                        }
                    }
                }
                _ => {}
            }
        }

        scan.pos = self.buffer.len();
        self.scan = scan;
        Ok(None)
    }

    /// Decode one extracted object into a chunk, surfacing server error lines
    pub fn decode<T: DeserializeOwned>(json_str: &str) -> Result<T> {
        if let Ok(line) = serde_json::from_str::<ServiceErrorLine>(json_str) {
            return Err(StreamError::OllamaApiError(line.error));
        }

        serde_json::from_str(json_str).map_err(|e| {
            StreamError::JsonParseError(format!("Failed to parse chunk: {}", e))
        })
    }

    /// Called once the body has ended; leftover non-whitespace is a truncated chunk
    pub fn finish(&mut self) -> Result<()> {
        let leftover = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        self.scan = ScanState::default();

        if leftover.is_empty() {
            Ok(())
        } else {
            Err(StreamError::StreamingError(format!(
                "Stream ended with incomplete chunk: {}",
                leftover
            )))
        }
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}
