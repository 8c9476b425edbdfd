//! Sparrow - Minimal HTTP/1.1 Server Engine
//!
//! Core library for request parsing, routing and connection handling.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod router;
pub mod server;

pub use error::HttpError;
pub use handler::{Handler, PathParams, Reply, SharedHandler, handler_fn};
pub use http::request::{Body, Method, Request};
pub use http::response::{Response, ResponseBuilder, StatusCode};
pub use router::{RouteError, Router};
pub use server::listener::Server;
