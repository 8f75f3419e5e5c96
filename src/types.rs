//! Core types shared by every layer: format identifiers, the message contract,
//! the format-carrier capability, and decoded replies.

use crate::error::BoxError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Canonical wire-format identifier: a lowercase `type/subtype` with no
/// parameters, e.g. `application/json`. This is the registry key.
///
/// An empty `FormatId` means "no format information".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FormatId(String);

impl<'de> Deserialize<'de> for FormatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(FormatId::new)
    }
}

impl FormatId {
    /// Create a format identifier, trimming and lowercasing the input.
    ///
    /// No grammar check happens here; use
    /// [`MediaType::parse`](crate::protocol::MediaType::parse) for untrusted input.
    pub fn new(id: impl AsRef<str>) -> Self {
        FormatId(id.as_ref().trim().to_ascii_lowercase())
    }

    /// The empty identifier.
    #[must_use]
    pub const fn empty() -> Self {
        FormatId(String::new())
    }

    /// Get the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier carries no format information.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormatId {
    fn from(s: &str) -> Self {
        FormatId::new(s)
    }
}

impl From<String> for FormatId {
    fn from(s: String) -> Self {
        FormatId::new(s)
    }
}

impl From<&FormatId> for FormatId {
    fn from(id: &FormatId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for FormatId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for FormatId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FormatId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Capability of a message to remember the format it was last decoded with.
///
/// The value persists until explicitly overwritten. The dispatcher reads it when
/// encoding requests and responses, and writes it after decoding requests (and
/// after sniffing).
pub trait FormatCarrier {
    /// The remembered format, if any.
    fn format(&self) -> Option<&FormatId>;

    /// Remember a format.
    fn set_format(&mut self, format: FormatId);
}

/// Ready-made [`FormatCarrier`] to embed in a message as a `#[serde(skip)]` field.
///
/// # Examples
///
/// ```
/// use rpc_encoding_http::{FormatCarrier, FormatId, FormatSlot, Message};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Ping {
///     seq: u32,
///     #[serde(skip)]
///     format: FormatSlot,
/// }
///
/// impl Message for Ping {
///     fn carrier(&self) -> Option<&dyn FormatCarrier> {
///         Some(&self.format)
///     }
///     fn carrier_mut(&mut self) -> Option<&mut dyn FormatCarrier> {
///         Some(&mut self.format)
///     }
/// }
///
/// let mut ping = Ping { seq: 1, format: FormatSlot::default() };
/// ping.format.set_format(FormatId::new("application/xml"));
/// assert_eq!(ping.format.format().unwrap(), "application/xml");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSlot(Option<FormatId>);

impl FormatSlot {
    /// Create a slot already holding a format.
    pub fn new(format: impl Into<FormatId>) -> Self {
        FormatSlot(Some(format.into()))
    }
}

impl FormatCarrier for FormatSlot {
    fn format(&self) -> Option<&FormatId> {
        self.0.as_ref()
    }

    fn set_format(&mut self, format: FormatId) {
        self.0 = Some(format);
    }
}

/// A value that can be exchanged through the dispatcher.
///
/// Messages that want to remember their negotiated format override
/// [`carrier`](Message::carrier) and [`carrier_mut`](Message::carrier_mut);
/// the defaults report that the message is not a carrier.
pub trait Message: Serialize + DeserializeOwned {
    /// Read access to the format carrier, if the message has one.
    fn carrier(&self) -> Option<&dyn FormatCarrier> {
        None
    }

    /// Write access to the format carrier, if the message has one.
    fn carrier_mut(&mut self) -> Option<&mut dyn FormatCarrier> {
        None
    }
}

impl Message for serde_json::Value {}

/// The outcome of decoding a response.
///
/// A non-success status is not a decode failure: the transported application
/// error is returned as [`Reply::Error`].
#[derive(Debug)]
pub enum Reply<M> {
    /// A successfully decoded message.
    Message(M),
    /// An application error carried by a non-success response.
    Error(BoxError),
}

impl<M> Reply<M> {
    /// Convert into a standard result.
    pub fn into_result(self) -> std::result::Result<M, BoxError> {
        match self {
            Reply::Message(m) => Ok(m),
            Reply::Error(e) => Err(e),
        }
    }

    /// The decoded message, if any.
    pub fn message(&self) -> Option<&M> {
        match self {
            Reply::Message(m) => Some(m),
            Reply::Error(_) => None,
        }
    }

    /// The transported error, if any.
    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Reply::Message(_) => None,
            Reply::Error(e) => Some(e.as_ref()),
        }
    }

    /// Whether this reply carries an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
