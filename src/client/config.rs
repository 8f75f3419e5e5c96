//! Client configuration.

use crate::dispatch::DEFAULT_MAX_SNIFF_BYTES;
use serde::{Deserialize, Serialize};

/// Configuration for an [`EncodingClient`](super::EncodingClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Largest response body accepted; larger bodies fail with
    /// [`EncodingError::BodyTooLarge`](crate::EncodingError::BodyTooLarge).
    pub max_response_bytes: usize,
    /// Log transport failures.
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            max_response_bytes: DEFAULT_MAX_SNIFF_BYTES,
            enable_logging: true,
        }
    }
}
