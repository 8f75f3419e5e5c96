//! Axum middleware that makes a [`Dispatcher`] available to handlers.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{middleware, routing::post, Router};
//! use rpc_encoding_http::EncodingLayer;
//!
//! let app = Router::new()
//!     .route("/rpc/echo", post(echo))
//!     .layer(middleware::from_fn(EncodingLayer::new().middleware()));
//! ```
//!
//! The middleware inserts an `Arc<Dispatcher>` into the request extensions,
//! where the [`Negotiated`](super::Negotiated) extractor and handlers using
//! `Extension<Arc<Dispatcher>>` pick it up.

use crate::dispatch::{Dispatcher, EncodingConfig};
use crate::envelope::ErrorTypeRegistry;
use crate::registry::Registry;
use axum::{extract::Request, middleware::Next, response::Response};
use std::sync::Arc;

/// Axum layer sharing one dispatcher across every request.
///
/// Cloning the layer clones the `Arc`, not the registries.
#[derive(Clone, Debug)]
pub struct EncodingLayer {
    dispatcher: Arc<Dispatcher>,
}

impl EncodingLayer {
    /// Layer over the default codecs with no error types registered.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dispatcher(Dispatcher::with_defaults())
    }

    /// Layer over existing registries and configuration.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use rpc_encoding_http::{EncodingConfig, EncodingLayer, ErrorTypeRegistry, Registry};
    /// use std::sync::Arc;
    ///
    /// let errors = ErrorTypeRegistry::new();
    /// errors.register::<QuotaExceeded>()?;
    ///
    /// let layer = EncodingLayer::with_config(
    ///     Arc::new(Registry::with_default_codecs()),
    ///     Arc::new(errors),
    ///     EncodingConfig { strict_errors: true, ..Default::default() },
    /// );
    /// ```
    #[must_use]
    pub fn with_config(
        registry: Arc<Registry>,
        errors: Arc<ErrorTypeRegistry>,
        config: EncodingConfig,
    ) -> Self {
        Self::with_dispatcher(Dispatcher::new(registry, errors, config))
    }

    /// Layer around an already built dispatcher.
    #[must_use]
    pub fn with_dispatcher(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// The shared dispatcher.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Create the middleware function for `axum::middleware::from_fn`.
    #[must_use]
    pub fn middleware(
        &self,
    ) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
           + Send
           + Sync
           + Clone {
        let dispatcher = self.dispatcher.clone();

        move |mut req: Request, next: Next| {
            let dispatcher = dispatcher.clone();
            Box::pin(async move {
                req.extensions_mut().insert(dispatcher);
                next.run(req).await
            })
        }
    }
}

impl Default for EncodingLayer {
    fn default() -> Self {
        Self::new()
    }
}
