//! Error types and result handling.
//!
//! Every fallible operation in this crate returns [`Result`], whose error side is
//! [`EncodingError`]. Negotiation degrades gracefully wherever a fallback exists,
//! so most variants only surface once every fallback has been exhausted.
//!
//! Application errors that travel across the wire are a different thing: they
//! are decoded into a [`BoxError`] and handed back as a value inside
//! [`Reply::Error`](crate::Reply::Error), never as an `EncodingError`.

use crate::types::FormatId;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EncodingError>;

/// A decoded application error, as returned by response decoding.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by registration, negotiation, and encoding/decoding.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A codec is already registered under this format.
    #[error("format {0} already has a registered codec")]
    AlreadyRegistered(FormatId),

    /// No codec is registered under this format.
    #[error("format {0} does not have an associated codec")]
    NotFound(FormatId),

    /// The registry is empty.
    #[error("nothing has been registered, nothing to use for encoding/decoding")]
    NoRegistrations,

    /// No format information was available on the message.
    #[error("no information was given to determine the format")]
    MimeNotSpecified,

    /// Every codec failed to decode the body during sniffing.
    #[error("unable to determine the format of the body")]
    UnableToDetermineMime,

    /// The operation is not supported by this encoding.
    #[error("operation is not implemented by this encoding")]
    NotImplemented,

    /// The configured default format has no registered codec.
    #[error("default format {0} has no registered codec")]
    EncodingUnavailable(FormatId),

    /// An error type was registered twice under the same name.
    #[error("error type {0} is already registered")]
    DuplicateErrorTypeRegistration(String),

    /// The error type is reserved and cannot be registered.
    #[error("error type {0:?} is reserved and cannot be registered")]
    BlacklistedErrorType(String),

    /// Strict decoding met an error type that could not be reconstructed.
    #[error("error type {0:?} has not been registered")]
    UnknownErrorType(String),

    /// The value is not a valid media type.
    #[error("invalid media type: {0}")]
    InvalidMediaType(String),

    /// A codec failed to serialize a value.
    #[error("{codec} encode error: {reason}")]
    Encode {
        /// Codec name.
        codec: &'static str,
        /// Underlying failure.
        reason: String,
    },

    /// A codec failed to deserialize a body.
    #[error("{codec} decode error: {reason}")]
    Decode {
        /// Codec name.
        codec: &'static str,
        /// Underlying failure.
        reason: String,
    },

    /// The body is larger than the configured ceiling.
    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge {
        /// Declared or actual size.
        size: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// A header value could not be constructed.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// Transport-level failure in the HTTP adapters.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl EncodingError {
    pub(crate) fn encode(codec: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Encode {
            codec,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(codec: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            codec,
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from a codec rejecting a body.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
