//! Dispatcher configuration.

use crate::protocol::constants::media;
use crate::types::FormatId;
use serde::{Deserialize, Serialize};

/// Default ceiling for buffered bodies (4 MiB).
pub const DEFAULT_MAX_SNIFF_BYTES: usize = 4 * 1024 * 1024;

/// Configuration for a [`Dispatcher`](super::Dispatcher).
///
/// # Examples
///
/// ```
/// use rpc_encoding_http::EncodingConfig;
///
/// let config = EncodingConfig {
///     strict_errors: true,
///     ..Default::default()
/// };
/// assert_eq!(config.default_format.as_str(), "application/json");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Format used when a message carries no registered format of its own,
    /// and for error responses.
    pub default_format: FormatId,

    /// Largest body buffered for sniffing or extraction. Bodies that declare
    /// or turn out to be larger are rejected.
    pub max_sniff_bytes: usize,

    /// Fail response decoding when a transported error cannot be rebuilt into
    /// its concrete type, instead of degrading to a message-only error.
    pub strict_errors: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            default_format: FormatId::new(media::APPLICATION_JSON),
            max_sniff_bytes: DEFAULT_MAX_SNIFF_BYTES,
            strict_errors: false,
        }
    }
}

impl EncodingConfig {
    /// Set the default format.
    #[must_use]
    pub fn with_default_format(mut self, format: impl Into<FormatId>) -> Self {
        self.default_format = format.into();
        self
    }

    /// Set the body ceiling.
    #[must_use]
    pub fn with_max_sniff_bytes(mut self, max: usize) -> Self {
        self.max_sniff_bytes = max;
        self
    }

    /// Enable or disable strict error reconstruction.
    #[must_use]
    pub fn with_strict_errors(mut self, strict: bool) -> Self {
        self.strict_errors = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EncodingConfig =
            serde_json::from_str(r#"{"default_format":"Application/XML"}"#).unwrap();
        assert_eq!(config.default_format, "application/xml");
        assert_eq!(config.max_sniff_bytes, DEFAULT_MAX_SNIFF_BYTES);
        assert!(!config.strict_errors);
    }

    #[test]
    fn test_builders() {
        let config = EncodingConfig::default()
            .with_default_format("text/xml")
            .with_max_sniff_bytes(16)
            .with_strict_errors(true);
        assert_eq!(config.default_format, "text/xml");
        assert_eq!(config.max_sniff_bytes, 16);
        assert!(config.strict_errors);
    }
}
