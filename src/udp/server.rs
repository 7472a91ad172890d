use super::config::UdpConfig;
use crate::common::{EchoServerTrait, RetryPolicy};
use crate::{EchoError, Result};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{Instrument, error, info, warn};

/// UDP port supervisor: owns one packet socket per bind cycle and runs a
/// single receive loop over it.
///
/// A bind failure is fatal for this supervisor only. A receive failure is
/// reported by the loop through a oneshot completion channel, after which
/// the supervisor re-binds the socket under a backoff delay. Reply
/// failures are non-fatal and skip to the next datagram.
///
/// # Examples
///
/// Basic server setup and running:
///
/// ```no_run
/// use echoportd::udp::{UdpConfig, UdpEchoServer};
/// use echoportd::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = UdpEchoServer::new(UdpConfig::for_port(9090));
///     server.run().await?;
///     Ok(())
/// }
/// ```
///
/// Server with graceful shutdown:
///
/// ```no_run
/// use echoportd::udp::{UdpConfig, UdpEchoServer};
/// use echoportd::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = UdpEchoServer::new(UdpConfig::default());
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
pub struct UdpEchoServer {
    config: UdpConfig,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl UdpEchoServer {
    /// Creates a new UDP echo server with the given configuration
    pub fn new(config: UdpConfig) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    /// Receives datagrams and echoes each back trimmed, with a trailing
    /// newline, until the first read error. The error is handed to the
    /// supervisor through `done`, which tears down and re-binds the socket.
    async fn receive_loop(socket: UdpSocket, config: UdpConfig, done: oneshot::Sender<std::io::Error>) {
        let mut buffer = vec![0u8; config.buffer_size];

        loop {
            let (n, addr) = match socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(e) => {
                    let _ = done.send(e);
                    return;
                }
            };

            let text = String::from_utf8_lossy(&buffer[..n]);
            let message = text.trim();
            info!(%addr, content = %message, "Received datagram");

            let mut reply = message.as_bytes().to_vec();
            reply.push(b'\n');

            // Bounded reply: a stalled send must not block the loop
            match timeout(config.write_timeout, socket.send_to(&reply, addr)).await {
                Ok(Ok(sent)) => info!(%addr, size = sent, "Echoed datagram"),
                Ok(Err(e)) => error!(%addr, error = %e, "Failed to send echo reply"),
                Err(_) => warn!(%addr, "Echo reply timed out"),
            }
        }
    }
}

#[async_trait]
impl EchoServerTrait for UdpEchoServer {
    /// Runs the bind/receive supervisor loop until a fatal bind error or a
    /// shutdown signal.
    async fn run(&self) -> Result<()> {
        let mut retry = RetryPolicy::default();
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            let socket = match UdpSocket::bind(self.config.bind_addr).await {
                Ok(socket) => socket,
                Err(e) => {
                    error!(address = %self.config.bind_addr, error = %e, "Failed to bind UDP socket");
                    return Err(EchoError::Udp(e));
                }
            };
            info!(address = %self.config.bind_addr, "UDP socket bound");

            let (done_tx, done_rx) = oneshot::channel();
            let span = tracing::info_span!("receive_loop", address = %self.config.bind_addr);
            let receiver =
                tokio::spawn(Self::receive_loop(socket, self.config.clone(), done_tx).instrument(span));

            tokio::select! {
                res = done_rx => {
                    match res {
                        Ok(e) => error!(error = %e, "Receive loop stopped on read error"),
                        // Sender dropped without an error means the loop died abnormally
                        Err(_) => error!("Receive loop stopped without reporting an error"),
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping UDP supervisor");
                    receiver.abort();
                    return Ok(());
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping UDP supervisor");
                    receiver.abort();
                    return Ok(());
                }
            }

            let delay = retry.next_delay();
            warn!(
                address = %self.config.bind_addr,
                delay_ms = delay.as_millis() as u64,
                "Rebinding UDP socket after receive failure"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
