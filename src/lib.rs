#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Content negotiation for HTTP RPC
//!
//! This crate lets an RPC transport exchange structured messages in one of
//! several interchangeable wire formats, chosen per exchange instead of fixed
//! at compile time.
//!
//! ## Overview
//!
//! For every exchange the [`Dispatcher`]:
//!
//! 1. **Negotiates** a format from the message's remembered format, the
//!    `Accept` and `Content-Type` headers, and a configured default
//! 2. **Dispatches** to the codec registered for that format in the [`Registry`]
//! 3. **Sniffs** the body when headers are missing or name an unknown format
//! 4. **Transports errors** on non-success responses as an envelope that the
//!    receiving side rebuilds into the original error type
//!
//! ## Formats
//!
//! | Format ids | Codec | Kind |
//! |------------|-------|------|
//! | `application/json`, `text/json` | [`JsonCodec`](codec::JsonCodec) | self-describing text |
//! | `application/xml`, `text/xml` | [`XmlCodec`](codec::XmlCodec) | self-describing markup |
//! | `application/postcard`, `application/octet-stream+postcard` | [`BinaryCodec`](codec::BinaryCodec) | compact binary |
//!
//! Additional codecs implement [`Codec`] and are added with
//! [`Registry::register`].
//!
//! ## Round trip
//!
//! ```
//! use bytes::Bytes;
//! use http::{header, Request};
//! use rpc_encoding_http::{Dispatcher, Encoding, FormatCarrier, FormatSlot, Message};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! #[serde(rename = "sum")]
//! struct Sum {
//!     a: i64,
//!     b: i64,
//!     #[serde(skip)]
//!     format: FormatSlot,
//! }
//!
//! impl Message for Sum {
//!     fn carrier(&self) -> Option<&dyn FormatCarrier> {
//!         Some(&self.format)
//!     }
//!     fn carrier_mut(&mut self) -> Option<&mut dyn FormatCarrier> {
//!         Some(&mut self.format)
//!     }
//! }
//!
//! let dispatcher = Dispatcher::with_defaults();
//!
//! // Ask for XML explicitly.
//! let sum = Sum { a: 1, b: 2, format: FormatSlot::new("application/xml") };
//! let mut req = Request::new(Bytes::new());
//! dispatcher.encode_request(&mut req, &sum).unwrap();
//! assert_eq!(req.headers()[header::CONTENT_TYPE], "application/xml");
//!
//! // Drop the header: the body is sniffed.
//! req.headers_mut().remove(header::CONTENT_TYPE);
//! let back: Sum = dispatcher.decode_request(&req).unwrap();
//! assert_eq!((back.a, back.b), (1, 2));
//! assert_eq!(back.format.format().unwrap(), "application/xml");
//! ```
//!
//! ## Error transport
//!
//! ```
//! use bytes::Bytes;
//! use http::Response;
//! use rpc_encoding_http::envelope::WireError;
//! use rpc_encoding_http::{Dispatcher, Encoding, Reply};
//! use serde::{Deserialize, Serialize};
//! use serde_json::Value;
//!
//! #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
//! #[error("Code: {code}, Reason: {reason}")]
//! struct AppError {
//!     code: i32,
//!     reason: String,
//! }
//!
//! impl WireError for AppError {
//!     const TYPE_NAME: &'static str = "AppError";
//! }
//!
//! let dispatcher = Dispatcher::with_defaults();
//! dispatcher.errors().register::<AppError>().unwrap();
//!
//! let mut res = Response::new(Bytes::new());
//! let err = AppError { code: 50, reason: "Halp".into() };
//! dispatcher.encode_error(&mut res, &err).unwrap();
//!
//! let reply: Reply<Value> = dispatcher.decode_response(&res).unwrap();
//! let err = reply.into_result().unwrap_err();
//! assert_eq!(err.downcast_ref::<AppError>().unwrap().code, 50);
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Format ids, the message contract, replies
//! - **[error]** - Error types and result handling
//! - **[registry]** - Codec registrations and sniff hints
//! - **[codec]** - The codec trait and the built-in codecs
//! - **[envelope]** - Error envelope and error type registry
//! - **[dispatch]** - Dispatcher, sniff resolver, configuration
//! - **[protocol]** - Media types, header parsers, constants
//! - **[server]** - Axum integration
//! - **[client]** - Reqwest integration

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod types;

pub use client::{ClientConfig, EncodingClient};
pub use codec::{Codec, RegisteredCodec};
pub use dispatch::{Dispatcher, Encoding, EncodingConfig, SniffResolver};
pub use envelope::{ErrorEnvelope, ErrorTypeRegistry, GenericError, WireError, WrappedError};
pub use error::{BoxError, EncodingError, Result};
pub use registry::Registry;
pub use server::{EncodingLayer, Negotiated};
pub use types::{FormatCarrier, FormatId, FormatSlot, Message, Reply};
