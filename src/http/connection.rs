use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{self, Instant, Sleep};

use crate::error::HttpError;
use crate::http::parser::parse_into;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::router::Router;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 1024;

/// Drives one accepted stream through a single request/response exchange.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    request: Request,
    router: Arc<Router>,
    idle_timeout: Duration,
    state: ConnectionState,
}

#[derive(Debug)]
enum ConnectionState {
    Reading,
    Dispatching,
    Replied,
    Error(HttpError),
    Closed,
}

impl ConnectionState {
    fn name(&self) -> &'static str {
        match self {
            ConnectionState::Reading => "reading",
            ConnectionState::Dispatching => "dispatching",
            ConnectionState::Replied => "replied",
            ConnectionState::Error(_) => "error",
            ConnectionState::Closed => "closed",
        }
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, router: Arc<Router>, idle_timeout: Duration) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            request: Request::new(),
            router,
            idle_timeout,
            state: ConnectionState::Reading,
        }
    }

    /// Runs the connection to completion and returns the status code sent.
    ///
    /// Every failure while reading or dispatching is answered with an error
    /// response; the stream is shut down in all cases. An `Err` is only
    /// returned when a successful response could not be written.
    pub async fn run(mut self) -> anyhow::Result<StatusCode> {
        // Armed on entry, pushed back on every read.
        let idle = time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        let mut outcome = Err(anyhow::anyhow!("connection closed without a reply"));

        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            tracing::debug!(state = state.name(), "connection state");

            self.state = match state {
                ConnectionState::Reading => match self.read_request(idle.as_mut()).await {
                    Ok(()) => ConnectionState::Dispatching,
                    Err(e) => ConnectionState::Error(e),
                },

                ConnectionState::Dispatching => match self.dispatch().await {
                    Ok(response) => match self.send(&response).await {
                        Ok(()) => {
                            outcome = Ok(response.status);
                            ConnectionState::Replied
                        }
                        Err(e) => {
                            self.shutdown().await;
                            outcome = Err(e);
                            ConnectionState::Closed
                        }
                    },
                    Err(e) => ConnectionState::Error(e),
                },

                ConnectionState::Error(err) => {
                    match &err {
                        HttpError::Internal(_) => tracing::error!(error = %err, "request failed"),
                        _ => tracing::warn!(error = %err, "request rejected"),
                    }

                    let response = err.to_response();
                    if let Err(e) = self.send(&response).await {
                        tracing::debug!(error = %e, "could not deliver error response");
                    }
                    outcome = Ok(response.status);

                    self.shutdown().await;
                    ConnectionState::Closed
                }

                ConnectionState::Replied => {
                    self.shutdown().await;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => return outcome,
            };
        }
    }

    /// Reads until the request is finished, resetting `idle` after every read.
    async fn read_request(&mut self, mut idle: Pin<&mut Sleep>) -> Result<(), HttpError> {
        let idle_timeout = self.idle_timeout;

        loop {
            self.buffer.reserve(READ_CHUNK);

            let n = tokio::select! {
                read = self.stream.read_buf(&mut self.buffer) => match read {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::debug!(error = %e, "read failed");
                        return Err(HttpError::Incomplete);
                    }
                },
                () = idle.as_mut() => return Err(HttpError::Timeout(idle_timeout)),
            };

            if n == 0 {
                // Client closed connection mid-request
                return Err(HttpError::Incomplete);
            }

            idle.as_mut().reset(Instant::now() + idle_timeout);
            parse_into(&mut self.request, &mut self.buffer)?;

            if self.request.is_finished() {
                return Ok(());
            }
        }
    }

    /// Looks up the handler and runs it in its own task so that a panic is
    /// contained to this request.
    async fn dispatch(&mut self) -> Result<Response, HttpError> {
        let request = std::mem::take(&mut self.request);
        let (handler, params) = self.router.get_handler(&request.path)?;

        let method = request.method.map_or("-", |m| m.as_str());
        tracing::info!(method, path = %request.path, "dispatching request");

        let task = tokio::spawn(async move { handler.call(request, params).await });

        match task.await {
            Ok(Ok(reply)) => Ok(reply.into_response()),
            Ok(Err(e)) => Err(HttpError::Internal(format!("{e:#}"))),
            Err(e) if e.is_panic() => Err(HttpError::Internal("handler panicked".to_string())),
            Err(e) => Err(HttpError::Internal(e.to_string())),
        }
    }

    /// Writes a response, giving up after one idle window.
    async fn send(&mut self, response: &Response) -> anyhow::Result<()> {
        let mut writer = ResponseWriter::new(response);

        time::timeout(self.idle_timeout, writer.write_to_stream(&mut self.stream))
            .await
            .map_err(|_| anyhow::anyhow!("timed out writing response"))??;

        tracing::debug!(status = response.status.as_u16(), bytes = writer.written(), "response sent");
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(error = %e, "shutdown failed");
        }
    }
}
