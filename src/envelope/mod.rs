//! Cross-format error transport.
//!
//! An application error travels as an envelope of three logical fields:
//!
//! | Field | Wire name | Content |
//! |-------|-----------|---------|
//! | type name | `type` | [`WireError::TYPE_NAME`] of the error, or a best-effort name |
//! | message | `errorString` | the error's `Display` output, never empty |
//! | payload | `error` | the error's own serialized data, only for registered types |
//!
//! On the receiving side the payload is rebuilt into the concrete type when
//! the type name is registered in the [`ErrorTypeRegistry`]. Otherwise only
//! the message survives and the error comes back as a [`GenericError`].
//!
//! Self-describing formats (JSON, XML) omit an absent payload and tolerate
//! unknown fields; the binary format writes the three fields positionally.

mod registry;

pub use registry::{ErrorTypeRegistry, WireError};

use crate::error::{BoxError, EncodingError, Result};
use registry::DecodeFn;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Serde name of the envelope structure. Reserved as an error type name.
pub const ENVELOPE_TYPE_NAME: &str = "ErrorEnvelope";

/// Type name reserved for errors rebuilt from their message alone.
pub const GENERIC_TYPE_NAME: &str = "GenericError";

const FIELD_TYPE: &str = "type";
const FIELD_MESSAGE: &str = "errorString";
const FIELD_PAYLOAD: &str = "error";
const FIELDS: &[&str] = &[FIELD_TYPE, FIELD_MESSAGE, FIELD_PAYLOAD];

/// Message used when an error displays as an empty string.
const EMPTY_MESSAGE: &str = "unknown error";

/// The outgoing side of an envelope, borrowing the error it wraps.
#[derive(Clone)]
pub struct WrappedError<'a> {
    type_name: Cow<'a, str>,
    message: String,
    payload: Option<&'a dyn erased_serde::Serialize>,
}

impl fmt::Debug for WrappedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedError")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

impl<'a> WrappedError<'a> {
    /// Wrap an error whose concrete type is unknown at compile time.
    ///
    /// If `err` is an instance of a registered [`WireError`], the envelope
    /// carries its tag and payload. A [`GenericError`] keeps the type name it
    /// arrived with, so relayed errors are not renamed. Anything else gets an
    /// empty type name and no payload.
    pub fn wrap(err: &'a (dyn StdError + 'static), errors: &ErrorTypeRegistry) -> Self {
        if let Some(found) = errors.resolve(err) {
            return Self::new(Cow::Borrowed(found.type_name), err, (found.as_payload)(err));
        }
        if let Some(generic) = err.downcast_ref::<GenericError>() {
            let name = generic.type_name().unwrap_or_default().to_string();
            return Self::new(Cow::Owned(name), err, None);
        }
        Self::new(Cow::Borrowed(""), err, None)
    }

    /// Wrap an error of a known type.
    ///
    /// Unregistered types carry their Rust type name so the receiver at least
    /// learns what failed.
    pub fn wrap_typed<E: StdError + 'static>(err: &'a E, errors: &ErrorTypeRegistry) -> Self {
        let wrapped = Self::wrap(err, errors);
        if wrapped.type_name.is_empty() && wrapped.payload.is_none() {
            return Self::new(Cow::Borrowed(std::any::type_name::<E>()), err, None);
        }
        wrapped
    }

    fn new(
        type_name: Cow<'a, str>,
        err: &(dyn StdError + 'static),
        payload: Option<&'a dyn erased_serde::Serialize>,
    ) -> Self {
        let mut message = err.to_string();
        if message.is_empty() {
            message = EMPTY_MESSAGE.to_string();
        }
        Self {
            type_name,
            message,
            payload,
        }
    }

    /// The type name written to the wire (possibly empty).
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The message written to the wire (never empty).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether structured error data is attached.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

impl Serialize for WrappedError<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let human = serializer.is_human_readable();
        let mut state = serializer.serialize_struct(ENVELOPE_TYPE_NAME, FIELDS.len())?;
        state.serialize_field(FIELD_TYPE, self.type_name.as_ref())?;
        state.serialize_field(FIELD_MESSAGE, &self.message)?;
        match self.payload {
            None if human => state.skip_field(FIELD_PAYLOAD)?,
            payload => state.serialize_field(FIELD_PAYLOAD, &payload)?,
        }
        state.end()
    }
}

/// A decoded envelope.
#[derive(Debug)]
pub struct ErrorEnvelope {
    /// Type name as received (possibly empty).
    pub type_name: String,
    /// Error message as received. Never empty: a missing message falls back
    /// to the type name, then to a fixed placeholder.
    pub message: String,
    /// The rebuilt error, when the type name was registered and a payload
    /// was present.
    pub error: Option<BoxError>,
}

impl ErrorEnvelope {
    /// The error this envelope stands for: the rebuilt payload if any,
    /// otherwise a [`GenericError`] built from the message.
    #[must_use]
    pub fn into_error(self) -> BoxError {
        match self.error {
            Some(error) => error,
            None => Box::new(GenericError::with_type_name(self.message, self.type_name)),
        }
    }

    /// Like [`into_error`](Self::into_error), but refuse to degrade.
    ///
    /// # Errors
    ///
    /// [`EncodingError::UnknownErrorType`] when the payload could not be
    /// rebuilt.
    pub fn into_strict_error(self) -> Result<BoxError> {
        self.error
            .ok_or(EncodingError::UnknownErrorType(self.type_name))
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ErrorEnvelope {}

/// An error rebuilt from its message alone.
///
/// Displays exactly the transported message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GenericError {
    message: String,
    type_name: Option<String>,
}

impl GenericError {
    /// Create an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            type_name: None,
        }
    }

    fn with_type_name(message: String, type_name: String) -> Self {
        Self {
            message,
            type_name: Some(type_name).filter(|t| !t.is_empty()),
        }
    }

    pub(crate) fn from_text(body: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(body))
    }

    /// The transported message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The type name the sender reported, if any.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
}

/// Deserializes an [`ErrorEnvelope`], rebuilding the payload through a registry.
pub struct EnvelopeSeed<'r> {
    errors: &'r ErrorTypeRegistry,
}

impl<'r> EnvelopeSeed<'r> {
    /// Create a seed resolving payload types through `errors`.
    pub fn new(errors: &'r ErrorTypeRegistry) -> Self {
        Self { errors }
    }
}

impl<'de> DeserializeSeed<'de> for EnvelopeSeed<'_> {
    type Value = ErrorEnvelope;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_struct(ENVELOPE_TYPE_NAME, FIELDS, self)
    }
}

impl<'de> Visitor<'de> for EnvelopeSeed<'_> {
    type Value = ErrorEnvelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an error envelope")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut type_name: Option<String> = None;
        let mut message: Option<String> = None;
        let mut error: Option<BoxError> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                FIELD_TYPE => type_name = Some(map.next_value()?),
                FIELD_MESSAGE => message = Some(map.next_value()?),
                FIELD_PAYLOAD => {
                    // The payload can only be typed once the tag has been seen.
                    let decode = type_name.as_deref().and_then(|t| self.errors.decoder(t));
                    error = map.next_value_seed(PayloadSeed { decode })?;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        let type_name = type_name.unwrap_or_default();
        Ok(ErrorEnvelope {
            message: received_message(message, &type_name),
            type_name,
            error,
        })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let type_name: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let message = received_message(seq.next_element()?, &type_name);

        // Positional formats cannot skip an unknown payload, so it is only
        // read when it can be typed.
        let error = match self.errors.decoder(&type_name) {
            Some(decode) => seq
                .next_element_seed(PayloadSeed { decode: Some(decode) })?
                .flatten(),
            None => None,
        };

        Ok(ErrorEnvelope {
            type_name,
            message,
            error,
        })
    }
}

/// A missing or empty message falls back to the type name, then to
/// [`EMPTY_MESSAGE`].
fn received_message(message: Option<String>, type_name: &str) -> String {
    match message.filter(|m| !m.is_empty()) {
        Some(message) => message,
        None if !type_name.is_empty() => type_name.to_string(),
        None => EMPTY_MESSAGE.to_string(),
    }
}

/// Deserializes the optional payload field.
struct PayloadSeed {
    decode: Option<DecodeFn>,
}

impl<'de> DeserializeSeed<'de> for PayloadSeed {
    type Value = Option<BoxError>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_option(self)
    }
}

impl<'de> Visitor<'de> for PayloadSeed {
    type Value = Option<BoxError>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an optional error payload")
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        match self.decode {
            Some(decode) => {
                let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
                decode(&mut erased).map(Some).map_err(de::Error::custom)
            }
            None => {
                IgnoredAny::deserialize(deserializer)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
    #[error("Code: {code}, Reason: {reason}")]
    struct Overheated {
        code: i32,
        reason: String,
    }

    impl WireError for Overheated {
        const TYPE_NAME: &'static str = "Overheated";
    }

    #[derive(Debug, thiserror::Error)]
    #[error("")]
    struct Silent;

    fn registry() -> ErrorTypeRegistry {
        let errors = ErrorTypeRegistry::new();
        errors.register::<Overheated>().unwrap();
        errors
    }

    fn decode_json(body: &[u8], errors: &ErrorTypeRegistry) -> ErrorEnvelope {
        let mut de = serde_json::Deserializer::from_slice(body);
        EnvelopeSeed::new(errors).deserialize(&mut de).unwrap()
    }

    #[test]
    fn test_wrap_registered_carries_payload() {
        let errors = registry();
        let err = Overheated {
            code: 50,
            reason: "Halp".to_string(),
        };
        let wrapped = WrappedError::wrap(&err, &errors);

        assert_eq!(wrapped.type_name(), "Overheated");
        assert_eq!(wrapped.message(), "Code: 50, Reason: Halp");
        assert!(wrapped.has_payload());

        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["type"], "Overheated");
        assert_eq!(json["errorString"], "Code: 50, Reason: Halp");
        assert_eq!(json["error"]["code"], 50);
    }

    #[test]
    fn test_wrap_unregistered_omits_payload() {
        let errors = registry();
        let err = std::io::Error::other("disk on fire");

        let wrapped = WrappedError::wrap(&err, &errors);
        assert_eq!(wrapped.type_name(), "");
        assert!(!wrapped.has_payload());

        let typed = WrappedError::wrap_typed(&err, &errors);
        assert!(typed.type_name().contains("io"));
        assert!(!typed.has_payload());

        let json = serde_json::to_value(&typed).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_wrap_never_has_empty_message() {
        let wrapped = WrappedError::wrap(&Silent, &ErrorTypeRegistry::new());
        assert!(!wrapped.message().is_empty());
    }

    #[test]
    fn test_generic_error_keeps_its_type_name_when_relayed() {
        let generic = GenericError::with_type_name("gone".into(), "Vanished".into());
        let wrapped = WrappedError::wrap(&generic, &ErrorTypeRegistry::new());
        assert_eq!(wrapped.type_name(), "Vanished");
        assert_eq!(wrapped.message(), "gone");
    }

    #[test]
    fn test_decode_registered_payload() {
        let body = br#"{"type":"Overheated","errorString":"Code: 50, Reason: Halp","error":{"code":50,"reason":"Halp"}}"#;
        let error = decode_json(body, &registry()).into_error();

        let concrete = error.downcast_ref::<Overheated>().unwrap();
        assert_eq!(concrete.code, 50);
        assert_eq!(concrete.reason, "Halp");
    }

    #[test]
    fn test_decode_unregistered_degrades_to_message() {
        let body = br#"{"type":"Mystery","errorString":"it broke","error":{"deep":[1,2,3]},"extra":true}"#;
        let envelope = decode_json(body, &registry());
        assert_eq!(envelope.type_name, "Mystery");
        assert!(envelope.error.is_none());

        let error = envelope.into_error();
        assert_eq!(error.to_string(), "it broke");
        let generic = error.downcast_ref::<GenericError>().unwrap();
        assert_eq!(generic.type_name(), Some("Mystery"));
    }

    #[test]
    fn test_decode_strict_rejects_unknown() {
        let body = br#"{"type":"Mystery","errorString":"it broke"}"#;
        let err = decode_json(body, &registry()).into_strict_error().unwrap_err();
        assert!(matches!(err, EncodingError::UnknownErrorType(name) if name == "Mystery"));
    }

    #[test]
    fn test_decode_missing_message_degrades() {
        let envelope = decode_json(br#"{"error":"boom"}"#, &registry());
        assert_eq!(envelope.type_name, "");
        assert!(envelope.error.is_none());
        assert_eq!(envelope.into_error().to_string(), EMPTY_MESSAGE);

        let envelope = decode_json(br#"{"type":"Mystery","errorString":""}"#, &registry());
        assert_eq!(envelope.into_error().to_string(), "Mystery");
    }

    #[test]
    fn test_binary_envelope_round_trip() {
        let errors = registry();
        let err = Overheated {
            code: 7,
            reason: "steam".to_string(),
        };
        let body = postcard::to_allocvec(&WrappedError::wrap(&err, &errors)).unwrap();

        let mut de = postcard::Deserializer::from_bytes(&body);
        let envelope = EnvelopeSeed::new(&errors).deserialize(&mut de).unwrap();
        let rebuilt = envelope.into_error();
        assert_eq!(rebuilt.downcast_ref::<Overheated>().unwrap().code, 7);

        // Same bytes, receiver without the type: message only.
        let mut de = postcard::Deserializer::from_bytes(&body);
        let envelope = EnvelopeSeed::new(&ErrorTypeRegistry::new())
            .deserialize(&mut de)
            .unwrap();
        assert_eq!(envelope.into_error().to_string(), "Code: 7, Reason: steam");
    }
}
