//! Codec registry: format identifiers mapped to codecs and sniff hints.
//!
//! Registration normally happens once at startup and lookups dominate
//! afterwards, so the map sits behind a [`parking_lot::RwLock`]: concurrent
//! lookups never block each other, registration is exclusive.
//!
//! Lookups return [`RegisteredCodec`] handles (an `Arc` clone) so the lock is
//! released before any body is decoded.

use crate::codec::{BinaryCodec, Codec, JsonCodec, RegisteredCodec, XmlCodec};
use crate::error::{EncodingError, Result};
use crate::protocol::constants::{hints, media};
use crate::protocol::MediaType;
use crate::types::FormatId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct Registration {
    codec: Arc<dyn Codec>,
    hints: Vec<char>,
}

/// Mapping of [`FormatId`] to codec, plus optional sniff hints per format.
///
/// # Examples
///
/// ```
/// use rpc_encoding_http::{codec::JsonCodec, EncodingError, FormatId, Registry};
///
/// let registry = Registry::new();
/// registry.register("application/json", JsonCodec, &['{', '[']).unwrap();
///
/// let codec = registry.get(&FormatId::new("application/json")).unwrap();
/// assert_eq!(codec.name(), "json");
///
/// let again = registry.register("Application/JSON", JsonCodec, &[]);
/// assert!(matches!(again, Err(EncodingError::AlreadyRegistered(_))));
/// ```
#[derive(Default)]
pub struct Registry {
    inner: RwLock<HashMap<FormatId, Registration>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the codecs that ship with the crate.
    ///
    /// | Format | Codec | Hints |
    /// |--------|-------|-------|
    /// | `application/json`, `text/json` | [`JsonCodec`] | `{` `[` |
    /// | `application/xml`, `text/xml` | [`XmlCodec`] | `<` |
    /// | `application/postcard`, `application/octet-stream+postcard` | [`BinaryCodec`] | none |
    #[must_use]
    pub fn with_default_codecs() -> Self {
        let json: Arc<dyn Codec> = Arc::new(JsonCodec);
        let xml: Arc<dyn Codec> = Arc::new(XmlCodec);
        let binary: Arc<dyn Codec> = Arc::new(BinaryCodec);

        let entries = [
            (media::APPLICATION_JSON, &json, hints::JSON),
            (media::TEXT_JSON, &json, hints::JSON),
            (media::APPLICATION_XML, &xml, hints::XML),
            (media::TEXT_XML, &xml, hints::XML),
            (media::APPLICATION_POSTCARD, &binary, hints::BINARY),
            (media::OCTET_STREAM_POSTCARD, &binary, hints::BINARY),
        ];

        let map = entries
            .into_iter()
            .map(|(id, codec, hints)| {
                let registration = Registration {
                    codec: Arc::clone(codec),
                    hints: hints.to_vec(),
                };
                (FormatId::new(id), registration)
            })
            .collect();

        Self {
            inner: RwLock::new(map),
        }
    }

    /// Register `codec` under `id` with optional sniff `hints`.
    ///
    /// The id is validated as a media type and reduced to its bare
    /// `type/subtype` form, so `Application/JSON; charset=utf-8` registers
    /// `application/json`.
    ///
    /// # Errors
    ///
    /// * [`EncodingError::InvalidMediaType`] if `id` is not a media type.
    /// * [`EncodingError::AlreadyRegistered`] if the format already has a codec.
    pub fn register(&self, id: impl Into<FormatId>, codec: impl Codec, hints: &[char]) -> Result<()> {
        self.register_shared(id, Arc::new(codec), hints)
    }

    /// Like [`register`](Self::register), for a codec instance shared between
    /// several formats.
    pub fn register_shared(
        &self,
        id: impl Into<FormatId>,
        codec: Arc<dyn Codec>,
        hints: &[char],
    ) -> Result<()> {
        let id = MediaType::parse(id.into().as_str())?.into_format();

        let mut map = self.inner.write();
        if map.contains_key(&id) {
            return Err(EncodingError::AlreadyRegistered(id));
        }

        tracing::debug!(format = %id, codec = codec.name(), ?hints, "registered codec");
        map.insert(
            id,
            Registration {
                codec,
                hints: hints.to_vec(),
            },
        );
        Ok(())
    }

    /// Look up the codec registered under `id`.
    ///
    /// # Errors
    ///
    /// * [`EncodingError::NoRegistrations`] if the registry is empty.
    /// * [`EncodingError::NotFound`] if `id` has no codec.
    pub fn get(&self, id: &FormatId) -> Result<RegisteredCodec> {
        let map = self.inner.read();
        if map.is_empty() {
            return Err(EncodingError::NoRegistrations);
        }
        map.get(id)
            .map(|r| RegisteredCodec::new(id.clone(), Arc::clone(&r.codec)))
            .ok_or_else(|| EncodingError::NotFound(id.clone()))
    }

    /// Whether `id` has a codec.
    #[must_use]
    pub fn contains(&self, id: &FormatId) -> bool {
        self.inner.read().contains_key(id)
    }

    /// All registered formats, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<FormatId> {
        let mut formats: Vec<_> = self.inner.read().keys().cloned().collect();
        formats.sort();
        formats
    }

    /// The sniff hints registered for `id` (empty if none or unregistered).
    #[must_use]
    pub fn hints(&self, id: &FormatId) -> Vec<char> {
        self.inner
            .read()
            .get(id)
            .map(|r| r.hints.clone())
            .unwrap_or_default()
    }

    /// Number of registered formats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Snapshot of the codecs whose hints include `c`.
    pub(crate) fn hinted(&self, c: char) -> Vec<RegisteredCodec> {
        self.inner
            .read()
            .iter()
            .filter(|(_, r)| r.hints.contains(&c))
            .map(|(id, r)| RegisteredCodec::new(id.clone(), Arc::clone(&r.codec)))
            .collect()
    }

    /// Snapshot of every registered codec, in unspecified order.
    pub(crate) fn codecs(&self) -> Vec<RegisteredCodec> {
        self.inner
            .read()
            .iter()
            .map(|(id, r)| RegisteredCodec::new(id.clone(), Arc::clone(&r.codec)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_on_empty_registry() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get(&FormatId::new("application/json")),
            Err(EncodingError::NoRegistrations)
        ));
    }

    #[test]
    fn test_register_then_get() {
        let registry = Registry::new();
        registry.register("application/json", JsonCodec, &['{']).unwrap();

        let codec = registry.get(&FormatId::new("application/json")).unwrap();
        assert_eq!(codec.id(), "application/json");
        assert_eq!(registry.hints(&FormatId::new("application/json")), vec!['{']);

        assert!(matches!(
            registry.get(&FormatId::new("application/xml")),
            Err(EncodingError::NotFound(id)) if id == "application/xml"
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        registry.register("text/xml", XmlCodec, &['<']).unwrap();

        let err = registry
            .register("text/xml; charset=utf-8", JsonCodec, &[])
            .unwrap_err();
        assert!(matches!(err, EncodingError::AlreadyRegistered(id) if id == "text/xml"));
        assert_eq!(registry.get(&FormatId::new("text/xml")).unwrap().name(), "xml");
    }

    #[test]
    fn test_register_rejects_invalid_id() {
        let registry = Registry::new();
        assert!(matches!(
            registry.register("json", JsonCodec, &[]),
            Err(EncodingError::InvalidMediaType(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_codecs() {
        let registry = Registry::with_default_codecs();
        assert_eq!(registry.len(), 6);
        assert!(registry.contains(&FormatId::new(media::OCTET_STREAM_POSTCARD)));

        let mut hinted: Vec<_> = registry
            .hinted('{')
            .into_iter()
            .map(|c| c.id().clone())
            .collect();
        hinted.sort();
        assert_eq!(hinted, vec![FormatId::new("application/json"), FormatId::new("text/json")]);
        assert!(registry.hinted('\u{0}').is_empty());
    }
}
