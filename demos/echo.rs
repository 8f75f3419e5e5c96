//! Echo server and client negotiating formats per call.
//!
//! Starts an axum server on an ephemeral port, then calls it once per wire
//! format and once with input the handler rejects.
//!
//! Run with: cargo run --example echo

use axum::{extract::Extension, http::StatusCode, middleware, response::Response, routing::post, Router};
use rpc_encoding_http::server::{respond, respond_error, Negotiated};
use rpc_encoding_http::{
    ClientConfig, Dispatcher, EncodingClient, EncodingConfig, EncodingLayer, ErrorTypeRegistry,
    FormatCarrier, FormatSlot, Message, Registry, Reply, WireError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "greeting")]
struct Greeting {
    text: String,
    count: u32,
    #[serde(skip)]
    format: FormatSlot,
}

impl Message for Greeting {
    fn carrier(&self) -> Option<&dyn FormatCarrier> {
        Some(&self.format)
    }

    fn carrier_mut(&mut self) -> Option<&mut dyn FormatCarrier> {
        Some(&mut self.format)
    }
}

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[error("Code: {code}, Reason: {reason}")]
struct EchoError {
    code: i32,
    reason: String,
}

impl WireError for EchoError {
    const TYPE_NAME: &'static str = "EchoError";
}

async fn echo(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Negotiated(mut greeting): Negotiated<Greeting>,
) -> Response {
    if greeting.count == 0 {
        let err = EchoError {
            code: 50,
            reason: "nothing to echo".to_string(),
        };
        return respond_error(&dispatcher, StatusCode::BAD_REQUEST, &err);
    }

    info!(format = ?greeting.format.format(), text = %greeting.text, "echoing");
    greeting.text = greeting.text.repeat(greeting.count as usize);
    respond(&dispatcher, StatusCode::OK, &greeting)
}

fn dispatcher() -> anyhow::Result<Dispatcher> {
    let errors = ErrorTypeRegistry::new();
    errors.register::<EchoError>()?;
    Ok(Dispatcher::new(
        Arc::new(Registry::with_default_codecs()),
        Arc::new(errors),
        EncodingConfig::default(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let layer = EncodingLayer::with_dispatcher(dispatcher()?);
    let app = Router::new()
        .route("/rpc/echo", post(echo))
        .layer(middleware::from_fn(layer.middleware()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/rpc/echo", listener.local_addr()?);
    tokio::spawn(async move { axum::serve(listener, app).await });

    let client = EncodingClient::with_config(Arc::new(dispatcher()?), ClientConfig::default());

    for format in ["application/json", "application/xml", "application/postcard"] {
        let greeting = Greeting {
            text: "hi ".to_string(),
            count: 2,
            format: FormatSlot::new(format),
        };
        match client.post::<_, Greeting>(&url, &greeting).await? {
            Reply::Message(reply) => println!("{format}: {}", reply.text),
            Reply::Error(e) => println!("{format}: error {e}"),
        }
    }

    let empty = Greeting {
        text: "silence".to_string(),
        count: 0,
        format: FormatSlot::default(),
    };
    let reply: Reply<Greeting> = client.post(&url, &empty).await?;
    if let Some(err) = reply.error() {
        match err.downcast_ref::<EchoError>() {
            Some(echo) => println!("rejected with code {}: {}", echo.code, echo.reason),
            None => println!("rejected: {err}"),
        }
    }

    Ok(())
}
