//! Codecs: the per-format serialization backends and the uniform
//! four-operation contract built on top of them.
//!
//! A [`Codec`] only knows how to turn a value into bytes and bytes back into a
//! value. It is object safe (values cross the boundary as
//! [`erased_serde`] trait objects) so that codecs of different formats can
//! live side by side in one [`Registry`](crate::Registry).
//!
//! [`RegisteredCodec`] pairs a codec with the [`FormatId`] it was registered
//! under and implements the HTTP-facing contract:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`encode_request`](RegisteredCodec::encode_request) | body, `Content-Type`, `Accept`, `Content-Length` |
//! | [`decode_request`](RegisteredCodec::decode_request) | body into the target type |
//! | [`encode_response`](RegisteredCodec::encode_response) | body, `Content-Type`, `Content-Length` |
//! | [`decode_response`](RegisteredCodec::decode_response) | message on 2xx, transported error otherwise |
//!
//! Three codecs ship with the crate:
//!
//! ```text
//! codec/
//! ├── json   - JsonCodec   (self-describing text)
//! ├── xml    - XmlCodec    (self-describing markup, one element per field)
//! └── binary - BinaryCodec (compact postcard encoding, schema shared by both ends)
//! ```

mod binary;
mod json;
mod xml;

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use xml::XmlCodec;

use crate::envelope::{EnvelopeSeed, ErrorEnvelope, ErrorTypeRegistry, GenericError, WrappedError};
use crate::error::{EncodingError, Result};
use crate::protocol::constants::media;
use crate::protocol::headers::{header_str, parse_content_type};
use crate::protocol::is_success;
use crate::types::{FormatId, Reply};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use serde::de::{DeserializeOwned, DeserializeSeed};
use serde::Serialize;
use std::sync::Arc;

/// Callback handed a type-erased deserializer positioned at the start of a body.
pub type ReadSink<'a> = dyn for<'de> FnMut(
        &mut dyn erased_serde::Deserializer<'de>,
    ) -> std::result::Result<(), erased_serde::Error>
    + 'a;

/// A wire format backend.
///
/// Implementations must be stateless or internally synchronised: a single
/// instance serves every exchange for its format concurrently.
pub trait Codec: Send + Sync + 'static {
    /// Short human-readable name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Serialize a value into a complete body.
    fn write(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>>;

    /// Present `body` to `sink` as a deserializer.
    ///
    /// Implementations reject trailing input where their format allows
    /// detecting it.
    fn read(&self, body: &[u8], sink: &mut ReadSink<'_>) -> Result<()>;
}

/// A codec bound to the format it was registered under.
///
/// Cheap to clone; lookups hand these out so that no registry lock is held
/// while a body is being decoded.
#[derive(Clone)]
pub struct RegisteredCodec {
    id: FormatId,
    codec: Arc<dyn Codec>,
}

impl std::fmt::Debug for RegisteredCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCodec")
            .field("id", &self.id)
            .field("codec", &self.codec.name())
            .finish()
    }
}

impl RegisteredCodec {
    pub(crate) fn new(id: FormatId, codec: Arc<dyn Codec>) -> Self {
        Self { id, codec }
    }

    /// The format this codec was registered under.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FormatId {
        &self.id
    }

    /// The underlying codec's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.codec.name()
    }

    /// Serialize `value` into a body.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        let erased: &dyn erased_serde::Serialize = &value;
        self.codec.write(erased).map(Bytes::from)
    }

    /// Deserialize a body into `T`.
    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T> {
        let mut decoded: Option<T> = None;
        self.codec.read(body, &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
            decoded = Some(erased_serde::deserialize::<T>(de)?);
            Ok(())
        })?;
        decoded.ok_or_else(|| EncodingError::decode(self.name(), "codec produced no value"))
    }

    /// Deserialize a body as an error envelope, reconstructing the payload
    /// through `errors`.
    pub fn decode_envelope(&self, body: &[u8], errors: &ErrorTypeRegistry) -> Result<ErrorEnvelope> {
        let mut decoded: Option<ErrorEnvelope> = None;
        self.codec.read(body, &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
            decoded = Some(EnvelopeSeed::new(errors).deserialize(de)?);
            Ok(())
        })?;
        decoded.ok_or_else(|| EncodingError::decode(self.name(), "codec produced no envelope"))
    }

    /// Encode `message` as the request body and advertise this format in
    /// both `Content-Type` and `Accept`.
    pub fn encode_request<M: Serialize>(&self, req: &mut Request<Bytes>, message: &M) -> Result<()> {
        let body = self.encode(message)?;
        let value = HeaderValue::from_str(self.id.as_str())?;

        let headers = req.headers_mut();
        headers.insert(CONTENT_TYPE, value.clone());
        headers.insert(ACCEPT, value);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        *req.body_mut() = body;
        Ok(())
    }

    /// Decode the request body. Headers are not consulted.
    pub fn decode_request<M: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<M> {
        self.decode(req.body())
    }

    /// Encode `message` as the response body. The status is left untouched.
    pub fn encode_response<M: Serialize>(&self, res: &mut Response<Bytes>, message: &M) -> Result<()> {
        let body = self.encode(message)?;
        self.set_body(res.headers_mut(), body.len())?;
        *res.body_mut() = body;
        Ok(())
    }

    /// Encode an error envelope as the response body.
    ///
    /// A success status is replaced by `500 Internal Server Error` so that the
    /// receiving side takes the error path.
    pub fn encode_error(&self, res: &mut Response<Bytes>, error: &WrappedError<'_>) -> Result<()> {
        let body = self.encode(error)?;
        if is_success(res.status()) {
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        }
        self.set_body(res.headers_mut(), body.len())?;
        *res.body_mut() = body;
        Ok(())
    }

    /// Decode a response.
    ///
    /// A success status decodes the body as `M`. Any other status yields
    /// [`Reply::Error`]: a `text/plain` body becomes an error with the body
    /// text as its message; anything else is decoded as an error envelope.
    /// With `strict`, an envelope whose type cannot be reconstructed fails
    /// with [`EncodingError::UnknownErrorType`].
    pub fn decode_response<M: DeserializeOwned>(
        &self,
        res: &Response<Bytes>,
        errors: &ErrorTypeRegistry,
        strict: bool,
    ) -> Result<Reply<M>> {
        self.decode_reply(res.status(), res.headers(), res.body(), errors, strict)
    }

    pub(crate) fn decode_reply<M: DeserializeOwned>(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        errors: &ErrorTypeRegistry,
        strict: bool,
    ) -> Result<Reply<M>> {
        if is_success(status) {
            return self.decode(body).map(Reply::Message);
        }

        if parse_content_type(header_str(headers, &CONTENT_TYPE)) == media::TEXT_PLAIN {
            return Ok(Reply::Error(Box::new(GenericError::from_text(body))));
        }

        let envelope = self.decode_envelope(body, errors)?;
        let error = if strict {
            envelope.into_strict_error()?
        } else {
            envelope.into_error()
        };
        Ok(Reply::Error(error))
    }

    fn set_body(&self, headers: &mut HeaderMap, len: usize) -> Result<()> {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(self.id.as_str())?);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "point")]
    struct Point {
        x: i32,
        y: i32,
        label: String,
    }

    fn point() -> Point {
        Point {
            x: 3,
            y: -4,
            label: "origin-ish".to_string(),
        }
    }

    fn codecs() -> Vec<RegisteredCodec> {
        vec![
            RegisteredCodec::new(FormatId::new(media::APPLICATION_JSON), Arc::new(JsonCodec)),
            RegisteredCodec::new(FormatId::new(media::APPLICATION_XML), Arc::new(XmlCodec)),
            RegisteredCodec::new(FormatId::new(media::APPLICATION_POSTCARD), Arc::new(BinaryCodec)),
        ]
    }

    #[test]
    fn test_round_trip_each_format() {
        for codec in codecs() {
            let body = codec.encode(&point()).unwrap();
            let back: Point = codec.decode(&body).unwrap();
            assert_eq!(back, point(), "codec {}", codec.name());
        }
    }

    #[test]
    fn test_encode_request_sets_headers() {
        for codec in codecs() {
            let mut req = Request::new(Bytes::new());
            codec.encode_request(&mut req, &point()).unwrap();

            let id = codec.id().as_str();
            assert_eq!(req.headers()[CONTENT_TYPE], id);
            assert_eq!(req.headers()[ACCEPT], id);
            assert_eq!(
                req.headers()[CONTENT_LENGTH],
                req.body().len().to_string().as_str()
            );

            let back: Point = codec.decode_request(&req).unwrap();
            assert_eq!(back, point());
        }
    }

    #[test]
    fn test_encode_response_sets_only_content_type() {
        let codec = &codecs()[0];
        let mut res = Response::new(Bytes::new());
        codec.encode_response(&mut res, &point()).unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], media::APPLICATION_JSON);
        assert!(res.headers().get(ACCEPT).is_none());
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        for codec in codecs() {
            let err = codec.decode::<Point>(b"\xff\xfe not a body").unwrap_err();
            assert!(err.is_decode(), "codec {}: {err}", codec.name());
        }
    }

    #[test]
    fn test_decode_response_plain_text_error() {
        let codec = &codecs()[0];
        let mut res = Response::new(Bytes::from_static(b"upstream exploded"));
        *res.status_mut() = StatusCode::BAD_GATEWAY;
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

        let reply: Reply<Point> = codec
            .decode_response(&res, &ErrorTypeRegistry::new(), false)
            .unwrap();
        assert_eq!(reply.error().unwrap().to_string(), "upstream exploded");
    }
}
