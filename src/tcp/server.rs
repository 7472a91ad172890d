use super::config::TcpConfig;
use crate::common::{EchoServerTrait, RetryPolicy};
use crate::{EchoError, Result};

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tracing::{Instrument, error, info, warn};

/// Line that ends a session instead of being echoed. Matched against the
/// whitespace-trimmed content, case-sensitive.
pub const STOP_WORD: &str = "STOP";

/// TCP port supervisor: owns one listening socket and spawns one session
/// handler per accepted connection.
///
/// A bind failure is fatal for this supervisor only; an accept failure
/// tears the listener down and re-binds it after a backoff delay. Sessions
/// are fire-and-forget and run until their own terminal condition.
///
/// # Examples
///
/// Basic server setup and running:
///
/// ```no_run
/// use echoportd::tcp::{TcpConfig, TcpEchoServer};
/// use echoportd::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = TcpEchoServer::new(TcpConfig::for_port(8080));
///     server.run().await?;
///     Ok(())
/// }
/// ```
///
/// Server with graceful shutdown:
///
/// ```no_run
/// use echoportd::tcp::{TcpConfig, TcpEchoServer};
/// use echoportd::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = TcpEchoServer::new(TcpConfig::default());
///     let shutdown_signal = server.shutdown_signal();
///
///     let server_handle = tokio::spawn(async move {
///         server.run().await
///     });
///
///     // Do other work...
///
///     let _ = shutdown_signal.send(());
///     server_handle.await??;
///     Ok(())
/// }
/// ```
pub struct TcpEchoServer {
    config: TcpConfig,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl TcpEchoServer {
    /// Creates a new TCP echo server with the given configuration
    pub fn new(config: TcpConfig) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    /// Handles one accepted connection until EOF, an I/O error, or the
    /// stop command.
    async fn handle_session(stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        // One buffered reader for the whole session; re-wrapping the
        // stream per read would drop bytes already buffered past the
        // current line.
        let mut reader = BufReader::new(read_half);
        let mut line = Vec::new();

        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).await?;
            if n == 0 {
                info!(%addr, "Client closed connection");
                break;
            }

            let text = String::from_utf8_lossy(&line);
            let message = text.trim();
            info!(%addr, content = %message, "Received line");

            if message == STOP_WORD {
                info!(%addr, "Stop command received");
                break;
            }

            // Echo the original bytes verbatim, terminator included
            write_half.write_all(&line).await?;
            write_half.flush().await?;
            info!(%addr, size = n, "Echoed line");
        }

        Ok(())
    }
}

#[async_trait]
impl EchoServerTrait for TcpEchoServer {
    /// Runs the bind/accept supervisor loop until a fatal bind error or a
    /// shutdown signal.
    async fn run(&self) -> Result<()> {
        let mut retry = RetryPolicy::default();
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            let listener = match TcpListener::bind(self.config.bind_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!(address = %self.config.bind_addr, error = %e, "Failed to bind TCP listener");
                    return Err(EchoError::Tcp(e));
                }
            };
            info!(address = %self.config.bind_addr, "TCP listener bound");

            let rebind = loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                retry.reset();
                                info!(%addr, "Accepted connection");

                                let span = tracing::info_span!("session", %addr);
                                tokio::spawn(async move {
                                    if let Err(e) = Self::handle_session(stream, addr).instrument(span).await {
                                        error!(%addr, error = %e, "Session ended with error");
                                    }
                                    info!(%addr, "Session closed");
                                });
                            }
                            Err(e) => {
                                error!(error = %e, "Failed to accept connection");
                                break true;
                            }
                        }
                    }
                    _ = signal::ctrl_c() => {
                        info!("Received shutdown signal, stopping TCP supervisor");
                        break false;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Received internal shutdown signal, stopping TCP supervisor");
                        break false;
                    }
                }
            };

            drop(listener);
            if !rebind {
                return Ok(());
            }

            let delay = retry.next_delay();
            warn!(
                address = %self.config.bind_addr,
                delay_ms = delay.as_millis() as u64,
                "Rebinding TCP listener after accept failure"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
