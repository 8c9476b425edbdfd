//! HTTP protocol implementation.
//!
//! This module implements a minimal HTTP/1.1 server that answers exactly one
//! request per connection.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection state machine with its inactivity timer
//! - **`parser`**: Incrementally parses requests out of a growing byte buffer
//! - **`body`**: Form and JSON body decoders, selected by Content-Type
//! - **`request`**: The request record the parser fills in
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Read bytes, feed the parser, reset the idle timer
//!        └──────┬──────┘
//!               │ Request finished
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Route lookup, run the handler
//!        └──────┬───────────┘
//!               │ Response written
//!               ▼
//!        ┌──────────────────┐
//!        │     Replied      │
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//!
//!   Reading / Dispatching ──failure──▶ Error ──error reply──▶ Closed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sparrow::http::connection::{Connection, DEFAULT_IDLE_TIMEOUT};
//! use sparrow::Router;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Arc::new(Router::new());
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let router = Arc::clone(&router);
//!         tokio::spawn(async move {
//!             let conn = Connection::new(socket, router, DEFAULT_IDLE_TIMEOUT);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod body;
pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
