//! Axum integration.
//!
//! ```text
//! server/
//! ├── middleware - EncodingLayer, shares the Dispatcher through extensions
//! └── extract    - Negotiated extractor, respond / respond_error builders
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{extract::Extension, http::StatusCode, middleware, response::Response, routing::post, Router};
//! use rpc_encoding_http::server::{respond, EncodingLayer, Negotiated};
//! use rpc_encoding_http::Dispatcher;
//! use std::sync::Arc;
//!
//! async fn echo(
//!     Extension(dispatcher): Extension<Arc<Dispatcher>>,
//!     Negotiated(greeting): Negotiated<Greeting>,
//! ) -> Response {
//!     respond(&dispatcher, StatusCode::OK, &greeting)
//! }
//!
//! let app = Router::new()
//!     .route("/rpc/echo", post(echo))
//!     .layer(middleware::from_fn(EncodingLayer::new().middleware()));
//! ```

mod extract;
mod middleware;

pub use extract::{respond, respond_error, Negotiated, NegotiationRejection};
pub use middleware::EncodingLayer;
