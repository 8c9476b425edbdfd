//! Per-connection failure classification.
//!
//! Every way a connection can fail maps to one [`HttpError`] variant, and every
//! variant maps to the status code of the error response sent to the peer.

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::response::{Response, StatusCode};
use crate::router::RouteError;

#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be parsed
    #[error("bad request: {0}")]
    BadRequest(#[from] ParseError),

    /// The peer closed the stream before the request was complete
    #[error("connection closed before the request was complete")]
    Incomplete,

    /// No route matches the request path
    #[error("no route for {0}")]
    NotFound(String),

    /// Nothing was received within the inactivity window
    #[error("connection idle for longer than {0:?}")]
    Timeout(std::time::Duration),

    /// The handler failed or panicked
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) | HttpError::Incomplete => StatusCode::BadRequest,
            HttpError::NotFound(_) => StatusCode::NotFound,
            HttpError::Timeout(_) | HttpError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Builds the minimal response sent for this error: the status code with
    /// its reason phrase as the body.
    pub fn to_response(&self) -> Response {
        Response::error(self.status())
    }
}

impl From<RouteError> for HttpError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::NotFound(path) => HttpError::NotFound(path),
            other => HttpError::Internal(other.to_string()),
        }
    }
}
