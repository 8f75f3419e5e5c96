//! The negotiating façade over the registries.
//!
//! [`Dispatcher`] is what transports call. For each exchange it decides which
//! format to use, from the message's own remembered format, the `Accept` and
//! `Content-Type` headers, and the configured default, and delegates to the
//! matching codec. When the headers give nothing usable it falls back to the
//! [`SniffResolver`].
//!
//! # Negotiation rules
//!
//! | Operation | Format chosen |
//! |-----------|---------------|
//! | encode request | carrier format if registered, else the default |
//! | decode request | `Content-Type` if registered, else sniffed |
//! | encode response | carrier format if registered, else the default |
//! | decode response | `Content-Type` if registered, else sniffed |
//!
//! After a request is decoded, a [`FormatCarrier`](crate::FormatCarrier)
//! message remembers the highest-quality registered `Accept` entry, or the
//! request's own format when `Accept` names nothing usable. Encoding the reply
//! from that message therefore answers in the format the client asked for.

mod config;
mod sniff;

pub use config::{EncodingConfig, DEFAULT_MAX_SNIFF_BYTES};
pub use sniff::SniffResolver;

use crate::codec::RegisteredCodec;
use crate::envelope::{ErrorTypeRegistry, GenericError, WrappedError};
use crate::error::{EncodingError, Result};
use crate::protocol::constants::media;
use crate::protocol::headers::header_str;
use crate::protocol::{is_success, parse_accept, parse_content_type};
use crate::registry::Registry;
use crate::types::{FormatId, Message, Reply};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Request, Response};
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{debug, warn};

/// The four-operation encoding contract.
pub trait Encoding {
    /// Encode `message` into the request body and headers.
    fn encode_request<M: Message>(&self, req: &mut Request<Bytes>, message: &M) -> Result<()>;

    /// Decode the request body into a message.
    fn decode_request<M: Message>(&self, req: &Request<Bytes>) -> Result<M>;

    /// Encode `message` into the response body and headers.
    fn encode_response<M: Message>(&self, res: &mut Response<Bytes>, message: &M) -> Result<()>;

    /// Decode a response into a message or a transported error.
    fn decode_response<M: Message>(&self, res: &Response<Bytes>) -> Result<Reply<M>>;
}

/// Content-negotiating dispatcher.
///
/// Holds no per-exchange state; clone it (cheaply) or share it behind an
/// `Arc` across tasks.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use http::{header, Request};
/// use rpc_encoding_http::{Dispatcher, Encoding};
/// use serde_json::{json, Value};
///
/// let dispatcher = Dispatcher::with_defaults();
///
/// let mut req = Request::new(Bytes::new());
/// dispatcher.encode_request(&mut req, &json!({"hello": "world"})).unwrap();
/// assert_eq!(req.headers()[header::CONTENT_TYPE], "application/json");
///
/// let decoded: Value = dispatcher.decode_request(&req).unwrap();
/// assert_eq!(decoded["hello"], "world");
/// ```
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    errors: Arc<ErrorTypeRegistry>,
    config: EncodingConfig,
}

impl Dispatcher {
    /// Create a dispatcher over existing registries.
    pub fn new(registry: Arc<Registry>, errors: Arc<ErrorTypeRegistry>, config: EncodingConfig) -> Self {
        Self {
            registry,
            errors,
            config,
        }
    }

    /// Dispatcher with the default codecs, no error types, default config.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(Registry::with_default_codecs()),
            Arc::new(ErrorTypeRegistry::new()),
            EncodingConfig::default(),
        )
    }

    /// The codec registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The error type registry.
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &Arc<ErrorTypeRegistry> {
        &self.errors
    }

    /// The configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// A sniffing resolver sharing this dispatcher's registries and limits.
    #[must_use]
    pub fn sniffer(&self) -> SniffResolver<'_> {
        SniffResolver::new(
            &self.registry,
            &self.errors,
            self.config.max_sniff_bytes,
            self.config.strict_errors,
        )
    }

    /// Choose the codec to encode `message` with.
    ///
    /// # Errors
    ///
    /// [`EncodingError::EncodingUnavailable`] if the message has no registered
    /// format and the default format is not registered either.
    pub fn negotiate<M: Message>(&self, message: &M) -> Result<RegisteredCodec> {
        match self.carried_codec(message) {
            Ok(codec) => Ok(codec),
            Err(e) => {
                debug!(reason = %e, "no usable carried format, using default");
                self.default_codec()
            }
        }
    }

    /// The codec for the format `message` remembers, without falling back.
    ///
    /// # Errors
    ///
    /// [`EncodingError::MimeNotSpecified`] when the message is not a carrier
    /// or carries no format; the registry's lookup error when the carried
    /// format is not registered.
    pub fn carried_codec<M: Message>(&self, message: &M) -> Result<RegisteredCodec> {
        let id = message
            .carrier()
            .and_then(|c| c.format())
            .ok_or(EncodingError::MimeNotSpecified)?;
        self.registry.get(id)
    }

    fn default_codec(&self) -> Result<RegisteredCodec> {
        let id = &self.config.default_format;
        self.registry.get(id).map_err(|_| {
            warn!(format = %id, "default format has no registered codec");
            EncodingError::EncodingUnavailable(id.clone())
        })
    }

    /// Encode `err` as an error response in the default format.
    ///
    /// Registered [`WireError`](crate::envelope::WireError) types travel with
    /// their payload; other types travel as their type name and message.
    pub fn encode_error<E: StdError + 'static>(&self, res: &mut Response<Bytes>, err: &E) -> Result<()> {
        let codec = self.default_codec()?;
        codec.encode_error(res, &WrappedError::wrap_typed(err, &self.errors))
    }

    /// Encode a type-erased error as an error response in the default format.
    pub fn encode_dyn_error(
        &self,
        res: &mut Response<Bytes>,
        err: &(dyn StdError + 'static),
    ) -> Result<()> {
        let codec = self.default_codec()?;
        codec.encode_error(res, &WrappedError::wrap(err, &self.errors))
    }
}

impl Encoding for Dispatcher {
    fn encode_request<M: Message>(&self, req: &mut Request<Bytes>, message: &M) -> Result<()> {
        let codec = self.negotiate(message)?;
        debug!(format = %codec.id(), "encoding request");
        codec.encode_request(req, message)
    }

    fn decode_request<M: Message>(&self, req: &Request<Bytes>) -> Result<M> {
        let content_type = parse_content_type(header_str(req.headers(), &CONTENT_TYPE));
        if content_type.is_empty() {
            debug!("request has no usable content type, sniffing");
            return self.sniffer().decode_request(req);
        }

        match self.registry.get(&content_type) {
            Ok(codec) => {
                let mut message: M = codec.decode_request(req)?;
                record_format(&mut message, &self.registry, req.headers(), &content_type);
                Ok(message)
            }
            Err(_) => {
                debug!(format = %content_type, "request format not registered, sniffing");
                self.sniffer().decode_request(req)
            }
        }
    }

    fn encode_response<M: Message>(&self, res: &mut Response<Bytes>, message: &M) -> Result<()> {
        let codec = self.negotiate(message)?;
        debug!(format = %codec.id(), "encoding response");
        codec.encode_response(res, message)
    }

    fn decode_response<M: Message>(&self, res: &Response<Bytes>) -> Result<Reply<M>> {
        let content_type = parse_content_type(header_str(res.headers(), &CONTENT_TYPE));
        if content_type.is_empty() {
            debug!("response has no usable content type, sniffing");
            return self.sniffer().decode_response(res);
        }

        if let Ok(codec) = self.registry.get(&content_type) {
            return codec.decode_response(res, &self.errors, self.config.strict_errors);
        }

        if !is_success(res.status()) && content_type == media::TEXT_PLAIN {
            return Ok(Reply::Error(Box::new(GenericError::from_text(res.body()))));
        }

        debug!(format = %content_type, "response format not registered, sniffing");
        self.sniffer().decode_response(res)
    }
}

/// Remember on a carrier message the format its reply should use.
///
/// Uses the highest-quality `Accept` entry when it is registered. Otherwise,
/// including when a lower-quality entry would be registered, the format the
/// body was decoded with is kept.
pub(crate) fn record_format<M: Message>(
    message: &mut M,
    registry: &Registry,
    headers: &HeaderMap,
    decoded_with: &FormatId,
) {
    let Some(carrier) = message.carrier_mut() else {
        return;
    };

    let highest = parse_accept(header_str(headers, &ACCEPT)).highest();
    let chosen = if !highest.is_empty() && registry.contains(&highest) {
        highest
    } else {
        decoded_with.clone()
    };

    debug!(format = %chosen, "recording negotiated format");
    carrier.set_format(chosen);
}
