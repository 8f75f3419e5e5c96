//! Decode-only fallback that guesses the wire format from the body.
//!
//! Used whenever `Content-Type` is missing or names an unregistered format.
//! The body is bounded, then decoded in two phases:
//!
//! 1. **Hinted**: codecs whose sniff hints contain the body's first code
//!    point are tried. The first success wins; a failing codec is excluded
//!    from phase 2.
//! 2. **Brute force**: every remaining registered codec is tried, in
//!    unspecified order. The first success wins.
//!
//! Because phase 2 order follows the registry's hash map, two formats that
//! both accept the same bytes may win differently across runs. Formats with
//! recognisable leading characters should register hints so that phase 1
//! settles them.

use super::{record_format, Encoding};
use crate::codec::RegisteredCodec;
use crate::envelope::ErrorTypeRegistry;
use crate::error::{EncodingError, Result};
use crate::protocol::headers::header_str;
use crate::registry::Registry;
use crate::types::{FormatId, Message, Reply};
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Request, Response};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Format-guessing decoder.
///
/// Encoding through a resolver always fails with
/// [`EncodingError::NotImplemented`]: there is nothing to guess from.
#[derive(Debug, Clone, Copy)]
pub struct SniffResolver<'a> {
    registry: &'a Registry,
    errors: &'a ErrorTypeRegistry,
    max_body_bytes: usize,
    strict: bool,
}

impl<'a> SniffResolver<'a> {
    /// Create a resolver over `registry`, rebuilding transported errors
    /// through `errors`.
    pub fn new(
        registry: &'a Registry,
        errors: &'a ErrorTypeRegistry,
        max_body_bytes: usize,
        strict: bool,
    ) -> Self {
        Self {
            registry,
            errors,
            max_body_bytes,
            strict,
        }
    }

    /// Apply the size ceiling and cut the body to its declared length.
    fn bounded<'b>(&self, headers: &HeaderMap, body: &'b [u8]) -> Result<&'b [u8]> {
        let declared = header_str(headers, &CONTENT_LENGTH)
            .trim()
            .parse::<usize>()
            .ok();
        let size = declared.unwrap_or(body.len());

        if size > self.max_body_bytes || body.len() > self.max_body_bytes {
            return Err(EncodingError::BodyTooLarge {
                size: size.max(body.len()),
                max: self.max_body_bytes,
            });
        }

        Ok(&body[..size.min(body.len())])
    }

    /// Run the two-phase search, returning the winning format and its result.
    fn sniff<T>(
        &self,
        body: &[u8],
        mut attempt: impl FnMut(&RegisteredCodec) -> Result<T>,
    ) -> Result<(FormatId, T)> {
        let mut tried: HashSet<FormatId> = HashSet::new();

        if let Some(first) = first_code_point(body) {
            for codec in self.registry.hinted(first) {
                match attempt(&codec) {
                    Ok(value) => {
                        debug!(format = %codec.id(), hint = ?first, "sniffed format from hint");
                        return Ok((codec.id().clone(), value));
                    }
                    Err(e) if e.is_decode() => {
                        trace!(format = %codec.id(), error = %e, "hinted format rejected body");
                        tried.insert(codec.id().clone());
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        for codec in self.registry.codecs() {
            if tried.contains(codec.id()) {
                continue;
            }
            match attempt(&codec) {
                Ok(value) => {
                    debug!(format = %codec.id(), "sniffed format by trial decode");
                    return Ok((codec.id().clone(), value));
                }
                Err(e) if e.is_decode() => {
                    trace!(format = %codec.id(), error = %e, "format rejected body");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(len = body.len(), "no registered format could decode the body");
        Err(EncodingError::UnableToDetermineMime)
    }
}

impl Encoding for SniffResolver<'_> {
    fn encode_request<M: Message>(&self, _req: &mut Request<Bytes>, _message: &M) -> Result<()> {
        Err(EncodingError::NotImplemented)
    }

    fn decode_request<M: Message>(&self, req: &Request<Bytes>) -> Result<M> {
        let body = self.bounded(req.headers(), req.body())?;
        let (id, mut message) = self.sniff(body, |codec| codec.decode::<M>(body))?;
        record_format(&mut message, self.registry, req.headers(), &id);
        Ok(message)
    }

    fn encode_response<M: Message>(&self, _res: &mut Response<Bytes>, _message: &M) -> Result<()> {
        Err(EncodingError::NotImplemented)
    }

    fn decode_response<M: Message>(&self, res: &Response<Bytes>) -> Result<Reply<M>> {
        let body = self.bounded(res.headers(), res.body())?;
        let (id, mut reply) = self.sniff(body, |codec| {
            codec.decode_reply::<M>(res.status(), res.headers(), body, self.errors, self.strict)
        })?;
        if let Reply::Message(message) = &mut reply {
            record_format(message, self.registry, res.headers(), &id);
        }
        Ok(reply)
    }
}

/// The first code point of the body, decoding at most one UTF-8 sequence.
fn first_code_point(body: &[u8]) -> Option<char> {
    let head = &body[..body.len().min(4)];
    String::from_utf8_lossy(head).chars().next()
}
