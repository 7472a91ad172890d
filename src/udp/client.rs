use crate::common::EchoClient;
use crate::{EchoError, Result};

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// UDP test client for the echo server
///
/// # Examples
///
/// Basic client usage:
///
/// ```no_run
/// use echoportd::udp::UdpEchoClient;
/// use echoportd::common::EchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let addr = "127.0.0.1:9090".parse()?;
///     let mut client = UdpEchoClient::connect(addr).await?;
///
///     let response = client.echo_string("ping").await?;
///     assert_eq!(response, "ping\n");
///     Ok(())
/// }
/// ```
pub struct UdpEchoClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    recv_timeout: Duration,
}

impl UdpEchoClient {
    /// Connects to a UDP echo server at the given address
    pub async fn connect(server_addr: SocketAddr) -> Result<Self> {
        // Bind to any available port
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .map_err(EchoError::Udp)?;

        Ok(Self {
            socket,
            server_addr,
            recv_timeout: Duration::from_secs(1),
        })
    }

    /// Sends one datagram and returns the reply together with its source
    /// address.
    pub async fn exchange(&mut self, data: &[u8]) -> Result<(Vec<u8>, SocketAddr)> {
        self.socket
            .send_to(data, self.server_addr)
            .await
            .map_err(EchoError::Udp)?;

        let mut buffer = vec![0; 1024];
        let (n, from) = timeout(self.recv_timeout, self.socket.recv_from(&mut buffer))
            .await
            .map_err(|_| EchoError::Timeout("UDP receive timeout".to_string()))?
            .map_err(EchoError::Udp)?;

        Ok((buffer[..n].to_vec(), from))
    }
}

#[async_trait]
impl EchoClient for UdpEchoClient {
    /// Sends data to the UDP echo server and returns the reply datagram.
    /// The server replies with the trimmed payload plus a trailing newline.
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let (reply, _) = self.exchange(data).await?;
        Ok(reply)
    }
}
