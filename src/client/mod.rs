//! HTTP client integration (reqwest).
//!
//! ```text
//! client/
//! ├── fetch  - EncodingClient, encodes requests and decodes replies
//! └── config - Client configuration
//! ```
//!
//! # Examples
//!
//! ```
//! use rpc_encoding_http::client::{ClientConfig, EncodingClient};
//! use rpc_encoding_http::Dispatcher;
//! use std::sync::Arc;
//!
//! // Default codecs and configuration
//! let client = EncodingClient::new();
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     request_timeout_ms: 5_000,
//!     ..Default::default()
//! };
//! let client = EncodingClient::with_config(Arc::new(Dispatcher::with_defaults()), config);
//! assert_eq!(client.config().request_timeout_ms, 5_000);
//! ```

mod config;
mod fetch;

pub use config::ClientConfig;
pub use fetch::EncodingClient;
