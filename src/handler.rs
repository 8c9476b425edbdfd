//! The contract between the server and application code.
//!
//! A handler is any async function taking the parsed [`Request`] and the
//! parameters captured from the route template:
//!
//! ```
//! use sparrow::{PathParams, Request};
//!
//! async fn welcome(_req: Request, params: PathParams) -> anyhow::Result<String> {
//!     Ok(format!("Welcome {}", params["name"]))
//! }
//! ```
//!
//! Handlers may return a plain body (wrapped into a `200 OK`) or a complete
//! [`Response`]. Returning `Err` produces a `500` for the peer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::http::request::Request;
use crate::http::response::Response;

/// Placeholder name to the path segment it matched.
pub type PathParams = HashMap<String, String>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Reply>> + Send + 'static>>;

pub type SharedHandler = Arc<dyn Handler>;

/// What a handler produced.
#[derive(Debug)]
pub enum Reply {
    /// A bare body, sent with `200 OK`
    Body(Vec<u8>),
    /// A response built by the handler itself
    Response(Response),
}

impl Reply {
    pub fn into_response(self) -> Response {
        match self {
            Reply::Body(body) => Response::ok(body),
            Reply::Response(response) => response,
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Reply::Body(body.into_bytes())
    }
}

impl From<&'static str> for Reply {
    fn from(body: &'static str) -> Self {
        Reply::Body(body.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Reply {
    fn from(body: Vec<u8>) -> Self {
        Reply::Body(body)
    }
}

impl From<Bytes> for Reply {
    fn from(body: Bytes) -> Self {
        Reply::Body(body.to_vec())
    }
}

pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request, params: PathParams) -> HandlerFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Into<Reply>,
{
    fn call(&self, request: Request, params: PathParams) -> HandlerFuture {
        let fut = (self)(request, params);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Boxes a handler so handlers of different types can share one collection,
/// e.g. for [`crate::router::Router::add_routes`].
pub fn handler_fn<H: Handler>(handler: H) -> SharedHandler {
    Arc::new(handler)
}
