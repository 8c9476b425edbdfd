use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{Instrument, info};

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::router::Router;

/// Owns the route table and accepts connections for it.
#[derive(Debug)]
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    /// Routes must all be registered before this point; the router is
    /// read-only once the server owns it.
    pub fn new(router: Router, config: ServerConfig) -> Self {
        Self {
            router: Arc::new(router),
            config,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.config.idle_timeout()
    }

    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accepts connections forever, one task per connection.
    ///
    /// Failures inside a connection never reach this loop; a failed accept is
    /// logged and the loop keeps going.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let idle_timeout = self.idle_timeout();
        info!(routes = self.router.len(), ?idle_timeout, "Accepting connections");

        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let router = Arc::clone(&self.router);
            tokio::spawn(
                handle_connection(socket, peer, router, idle_timeout)
                    .instrument(tracing::info_span!("conn", %peer)),
            );
        }
    }
}

async fn handle_connection(
    socket: tokio::net::TcpStream,
    peer: SocketAddr,
    router: Arc<Router>,
    idle_timeout: Duration,
) {
    let conn = Connection::new(socket, router, idle_timeout);
    match conn.run().await {
        Ok(status) => tracing::debug!(status = status.as_u16(), "Connection closed"),
        Err(e) => tracing::error!("Connection error from {}: {}", peer, e),
    }
}
