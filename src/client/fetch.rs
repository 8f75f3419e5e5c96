//! HTTP client that negotiates formats through a [`Dispatcher`].
//!
//! # Examples
//!
//! ```ignore
//! use rpc_encoding_http::client::EncodingClient;
//! use rpc_encoding_http::Reply;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EncodingClient::new();
//!     match client.post::<_, Greeting>("http://localhost:3000/rpc/echo", &greeting).await? {
//!         Reply::Message(reply) => println!("echoed: {}", reply.text),
//!         Reply::Error(e) => eprintln!("server said: {e}"),
//!     }
//!     Ok(())
//! }
//! ```

use crate::client::config::ClientConfig;
use crate::dispatch::{Dispatcher, Encoding};
use crate::error::{EncodingError, Result};
use crate::types::{Message, Reply};
use bytes::Bytes;
use http::Method;
use std::sync::Arc;

/// HTTP client encoding requests and decoding replies through a dispatcher.
///
/// The request format follows the message's carrier (or the dispatcher's
/// default); the reply is decoded from whatever the server answered with,
/// sniffing when it does not say.
#[derive(Clone, Debug)]
pub struct EncodingClient {
    client: reqwest::Client,
    dispatcher: Arc<Dispatcher>,
    config: Arc<ClientConfig>,
}

impl EncodingClient {
    /// Client with the default codecs and configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Arc::new(Dispatcher::with_defaults()), ClientConfig::default())
    }

    /// Client over an existing dispatcher.
    pub fn with_config(dispatcher: Arc<Dispatcher>, config: ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            client,
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// The dispatcher used for both directions.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get the client configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `POST` a message and decode the reply.
    pub async fn post<Req: Message, Resp: Message>(&self, url: &str, request: &Req) -> Result<Reply<Resp>> {
        self.call(Method::POST, url, request).await
    }

    /// Send `request` with `method` and decode the reply.
    ///
    /// A non-success status is not a failure: the transported error comes
    /// back as [`Reply::Error`]. Transport problems surface as
    /// [`EncodingError::Http`].
    pub async fn call<Req: Message, Resp: Message>(
        &self,
        method: Method,
        url: &str,
        request: &Req,
    ) -> Result<Reply<Resp>> {
        let mut outgoing = http::Request::new(Bytes::new());
        self.dispatcher.encode_request(&mut outgoing, request)?;
        let (parts, body) = outgoing.into_parts();

        let response = self
            .client
            .request(method, url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let max = self.config.max_response_bytes;
        if let Some(declared) = response.content_length() {
            let declared = usize::try_from(declared).unwrap_or(usize::MAX);
            if declared > max {
                return Err(EncodingError::BodyTooLarge { size: declared, max });
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        if body.len() > max {
            return Err(EncodingError::BodyTooLarge {
                size: body.len(),
                max,
            });
        }

        let mut incoming = http::Response::new(body);
        *incoming.status_mut() = status;
        *incoming.headers_mut() = headers;

        tracing::debug!(%url, %status, "decoding response");
        self.dispatcher.decode_response(&incoming)
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> EncodingError {
        if self.config.enable_logging {
            tracing::warn!(%url, error = %e, "request failed");
        }
        EncodingError::Http(e.to_string())
    }
}

impl Default for EncodingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{ErrorTypeRegistry, WireError};
    use crate::registry::Registry;
    use crate::EncodingConfig;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
    #[error("out of stock: {sku}")]
    struct OutOfStock {
        sku: String,
    }

    impl WireError for OutOfStock {
        const TYPE_NAME: &'static str = "OutOfStock";
    }

    #[test]
    fn test_client_creation() {
        let client = EncodingClient::new();
        assert_eq!(client.config().request_timeout_ms, 30_000);
        assert!(client.config().enable_logging);
    }

    #[tokio::test]
    async fn test_post_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rpc/add")
            .match_header("content-type", "application/json")
            .match_header("accept", "application/json")
            .match_body(mockito::Matcher::Json(json!({"a": 2, "b": 3})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sum":5}"#)
            .create_async()
            .await;

        let client = EncodingClient::new();
        let url = format!("{}/rpc/add", server.url());
        let reply: Reply<Value> = client.post(&url, &json!({"a": 2, "b": 3})).await.unwrap();

        assert_eq!(reply.into_result().unwrap()["sum"], 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_plain_text_error_reply() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rpc/add")
            .with_status(503)
            .with_header("content-type", "text/plain")
            .with_body("try again later")
            .create_async()
            .await;

        let client = EncodingClient::new();
        let url = format!("{}/rpc/add", server.url());
        let reply: Reply<Value> = client.post(&url, &json!({})).await.unwrap();

        assert_eq!(reply.error().unwrap().to_string(), "try again later");
    }

    #[tokio::test]
    async fn test_registered_error_reply() {
        let errors = ErrorTypeRegistry::new();
        errors.register::<OutOfStock>().unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(Registry::with_default_codecs()),
            Arc::new(errors),
            EncodingConfig::default(),
        );

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rpc/order")
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(r#"{"type":"OutOfStock","errorString":"out of stock: A-1","error":{"sku":"A-1"}}"#)
            .create_async()
            .await;

        let client = EncodingClient::with_config(Arc::new(dispatcher), ClientConfig::default());
        let url = format!("{}/rpc/order", server.url());
        let reply: Reply<Value> = client.post(&url, &json!({"sku": "A-1"})).await.unwrap();

        let err = reply.into_result().unwrap_err();
        assert_eq!(err.downcast_ref::<OutOfStock>().unwrap().sku, "A-1");
    }

    #[tokio::test]
    async fn test_response_over_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rpc/big")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"payload":"0123456789"}"#)
            .create_async()
            .await;

        let config = ClientConfig {
            max_response_bytes: 8,
            ..Default::default()
        };
        let client = EncodingClient::with_config(Arc::new(Dispatcher::with_defaults()), config);
        let url = format!("{}/rpc/big", server.url());
        let result: Result<Reply<Value>> = client.post(&url, &json!({})).await;

        assert!(matches!(result, Err(EncodingError::BodyTooLarge { max: 8, .. })));
    }

    #[tokio::test]
    async fn test_connection_failure_is_http_error() {
        let client = EncodingClient::new();
        let result: Result<Reply<Value>> = client.post("http://127.0.0.1:1/rpc", &json!({})).await;
        assert!(matches!(result, Err(EncodingError::Http(_))));
    }
}
