//! Error type registry: stable type names mapped to reconstruction functions.

use super::{GENERIC_TYPE_NAME, ENVELOPE_TYPE_NAME};
use crate::error::{BoxError, EncodingError, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as StdError;

/// An application error that can cross the wire with its structure intact.
///
/// `TYPE_NAME` is the stable tag written into the envelope; both ends must
/// register the type under the same tag for the payload to be rebuilt.
///
/// # Examples
///
/// ```
/// use rpc_encoding_http::envelope::{ErrorTypeRegistry, WireError};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
/// #[error("quota exceeded for {tenant}")]
/// struct QuotaExceeded {
///     tenant: String,
/// }
///
/// impl WireError for QuotaExceeded {
///     const TYPE_NAME: &'static str = "QuotaExceeded";
/// }
///
/// let errors = ErrorTypeRegistry::new();
/// errors.register::<QuotaExceeded>().unwrap();
/// assert!(errors.contains("QuotaExceeded"));
/// ```
pub trait WireError: StdError + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable tag identifying this type on the wire.
    const TYPE_NAME: &'static str;
}

pub(crate) type PayloadFn =
    for<'a> fn(&'a (dyn StdError + 'static)) -> Option<&'a dyn erased_serde::Serialize>;

pub(crate) type DecodeFn = for<'a, 'de> fn(
    &'a mut dyn erased_serde::Deserializer<'de>,
) -> std::result::Result<BoxError, erased_serde::Error>;

#[derive(Clone, Copy)]
pub(crate) struct ErrorType {
    pub(crate) type_name: &'static str,
    pub(crate) as_payload: PayloadFn,
    pub(crate) decode: DecodeFn,
}

fn payload_of<'a, E: WireError>(err: &'a (dyn StdError + 'static)) -> Option<&'a dyn erased_serde::Serialize> {
    err.downcast_ref::<E>()
        .map(|e| e as &dyn erased_serde::Serialize)
}

fn decode_as<E: WireError>(
    de: &mut dyn erased_serde::Deserializer<'_>,
) -> std::result::Result<BoxError, erased_serde::Error> {
    let value: E = erased_serde::deserialize(de)?;
    Ok(Box::new(value))
}

/// Registry of [`WireError`] types that can be rebuilt after transport.
///
/// Like the codec [`Registry`](crate::Registry) it is meant to be filled at
/// startup and shared read-mostly afterwards.
#[derive(Default)]
pub struct ErrorTypeRegistry {
    types: RwLock<HashMap<&'static str, ErrorType>>,
}

impl std::fmt::Debug for ErrorTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.types.read().keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("ErrorTypeRegistry").field("types", &names).finish()
    }
}

impl ErrorTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` under [`WireError::TYPE_NAME`].
    ///
    /// # Errors
    ///
    /// * [`EncodingError::BlacklistedErrorType`] for an empty tag or one of the
    ///   reserved envelope tags (`ErrorEnvelope`, `GenericError`).
    /// * [`EncodingError::DuplicateErrorTypeRegistration`] if the tag is taken.
    pub fn register<E: WireError>(&self) -> Result<()> {
        let name = E::TYPE_NAME;
        if name.is_empty() || name == ENVELOPE_TYPE_NAME || name == GENERIC_TYPE_NAME {
            return Err(EncodingError::BlacklistedErrorType(name.to_string()));
        }

        let mut types = self.types.write();
        if types.contains_key(name) {
            return Err(EncodingError::DuplicateErrorTypeRegistration(name.to_string()));
        }

        tracing::debug!(type_name = name, "registered error type");
        types.insert(
            name,
            ErrorType {
                type_name: name,
                as_payload: payload_of::<E>,
                decode: decode_as::<E>,
            },
        );
        Ok(())
    }

    /// Whether a type is registered under `type_name`.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    pub(crate) fn decoder(&self, type_name: &str) -> Option<DecodeFn> {
        self.types.read().get(type_name).map(|t| t.decode)
    }

    /// Find the registered type `err` is an instance of.
    pub(crate) fn resolve(&self, err: &(dyn StdError + 'static)) -> Option<ErrorType> {
        self.types
            .read()
            .values()
            .find(|t| (t.as_payload)(err).is_some())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
    #[error("teapot")]
    struct Teapot;

    impl WireError for Teapot {
        const TYPE_NAME: &'static str = "Teapot";
    }

    #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
    #[error("impostor")]
    struct Impostor;

    impl WireError for Impostor {
        const TYPE_NAME: &'static str = "GenericError";
    }

    #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
    #[error("nameless")]
    struct Nameless;

    impl WireError for Nameless {
        const TYPE_NAME: &'static str = "";
    }

    #[test]
    fn test_register_and_resolve() {
        let errors = ErrorTypeRegistry::new();
        errors.register::<Teapot>().unwrap();

        assert!(errors.contains("Teapot"));
        assert!(errors.decoder("Teapot").is_some());
        assert!(errors.decoder("Kettle").is_none());

        let err: &(dyn StdError + 'static) = &Teapot;
        assert_eq!(errors.resolve(err).unwrap().type_name, "Teapot");

        let other = std::io::Error::other("nope");
        assert!(errors.resolve(&other).is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let errors = ErrorTypeRegistry::new();
        errors.register::<Teapot>().unwrap();
        assert!(matches!(
            errors.register::<Teapot>(),
            Err(EncodingError::DuplicateErrorTypeRegistration(name)) if name == "Teapot"
        ));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_reserved_names_are_blacklisted() {
        let errors = ErrorTypeRegistry::new();
        assert!(matches!(
            errors.register::<Impostor>(),
            Err(EncodingError::BlacklistedErrorType(_))
        ));
        assert!(matches!(
            errors.register::<Nameless>(),
            Err(EncodingError::BlacklistedErrorType(_))
        ));
        assert!(errors.is_empty());
    }
}
