//! Request extraction and response building for axum handlers.

use crate::dispatch::{Dispatcher, Encoding};
use crate::error::EncodingError;
use crate::protocol::headers::header_str;
use crate::types::Message;
use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::{header::CONTENT_LENGTH, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Extractor decoding the request body through the layer's dispatcher.
///
/// Must be the last extractor of a handler, since it consumes the body.
/// Carrier messages come out remembering the format their reply should use.
///
/// ```ignore
/// async fn echo(
///     Extension(dispatcher): Extension<Arc<Dispatcher>>,
///     Negotiated(greeting): Negotiated<Greeting>,
/// ) -> Response {
///     respond(&dispatcher, StatusCode::OK, &greeting)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Negotiated<T>(pub T);

impl<S, T> FromRequest<S> for Negotiated<T>
where
    T: Message + Send,
    S: Send + Sync,
{
    type Rejection = NegotiationRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let dispatcher = req
            .extensions()
            .get::<Arc<Dispatcher>>()
            .cloned()
            .ok_or(NegotiationRejection::MissingLayer)?;

        let max = dispatcher.config().max_sniff_bytes;
        let declared = header_str(req.headers(), &CONTENT_LENGTH).trim().parse::<usize>().ok();
        if let Some(size) = declared.filter(|size| *size > max) {
            return Err(EncodingError::BodyTooLarge { size, max }.into());
        }

        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, max)
            .await
            .map_err(|e| NegotiationRejection::Body(e.to_string()))?;
        let req = http::Request::from_parts(parts, bytes);

        Ok(Negotiated(dispatcher.decode_request(&req)?))
    }
}

/// Why a [`Negotiated`] extraction failed.
#[derive(Debug, Error)]
pub enum NegotiationRejection {
    /// The route is not wrapped in an [`EncodingLayer`](super::EncodingLayer).
    #[error("no dispatcher installed for this route")]
    MissingLayer,

    /// The body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The body could not be decoded.
    #[error(transparent)]
    Decode(#[from] EncodingError),
}

impl NegotiationRejection {
    /// Status code sent back to the client.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingLayer => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Decode(EncodingError::UnableToDetermineMime) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Decode(EncodingError::BodyTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Decode(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for NegotiationRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request extraction failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Encode `message` as a response with `status`.
///
/// Encoding failures are logged and turned into a plain-text 500.
pub fn respond<M: Message>(dispatcher: &Dispatcher, status: StatusCode, message: &M) -> Response {
    let mut res = http::Response::new(Bytes::new());
    *res.status_mut() = status;

    match dispatcher.encode_response(&mut res, message) {
        Ok(()) => res.map(Body::from),
        Err(e) => encode_failure(e),
    }
}

/// Encode `err` as an error response with `status` in the default format.
///
/// A success `status` is replaced by 500 so the caller sees an error.
pub fn respond_error<E: StdError + 'static>(dispatcher: &Dispatcher, status: StatusCode, err: &E) -> Response {
    let mut res = http::Response::new(Bytes::new());
    *res.status_mut() = status;

    match dispatcher.encode_error(&mut res, err) {
        Ok(()) => res.map(Body::from),
        Err(e) => encode_failure(e),
    }
}

fn encode_failure(e: EncodingError) -> Response {
    error!(error = %e, "failed to encode response");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            NegotiationRejection::from(EncodingError::UnableToDetermineMime).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            NegotiationRejection::from(EncodingError::BodyTooLarge { size: 9, max: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            NegotiationRejection::from(EncodingError::decode("json", "eof")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            NegotiationRejection::MissingLayer.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rejection_body_is_plain_text() {
        let res = NegotiationRejection::from(EncodingError::UnableToDetermineMime).into_response();
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(res.headers()[axum::http::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = tokio_test::block_on(axum::body::to_bytes(res.into_body(), usize::MAX)).unwrap();
        assert_eq!(body, EncodingError::UnableToDetermineMime.to_string().as_bytes());
    }

    #[test]
    fn test_respond_error_uses_default_format() {
        let dispatcher = Dispatcher::with_defaults();
        let err = std::io::Error::other("no space left");
        let res = respond_error(&dispatcher, StatusCode::OK, &err);

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[axum::http::header::CONTENT_TYPE], "application/json");
    }
}
