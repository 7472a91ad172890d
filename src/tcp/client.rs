use crate::common::EchoClient;
use crate::{EchoError, Result};

use async_trait::async_trait;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// Configuration for the TCP line client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Read timeout for operations
    pub read_timeout: Duration,
    /// Write timeout for operations
    pub write_timeout: Duration,
    /// Buffer size for reading data
    pub buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            buffer_size: 1024,
        }
    }
}

/// Line-oriented TCP client for the echo server
///
/// # Examples
///
/// ```no_run
/// use echoportd::tcp::TcpEchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let addr = "127.0.0.1:8080".parse()?;
///     let mut client = TcpEchoClient::connect(addr).await?;
///
///     client.send_line("Hello, Server!").await?;
///     let response = client.recv_line().await?;
///     assert_eq!(response.as_deref(), Some("Hello, Server!"));
///     Ok(())
/// }
/// ```
pub struct TcpEchoClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    config: ClientConfig,
}

impl TcpEchoClient {
    /// Connects to an echo server with custom configuration
    pub async fn connect_with_config(addr: SocketAddr, config: ClientConfig) -> Result<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| EchoError::Timeout("Connection timeout".to_string()))?
            .map_err(EchoError::Tcp)?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            config,
        })
    }

    /// Connects with default configuration
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Sends one line, appending the newline terminator
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        timeout(self.config.write_timeout, async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await
        })
        .await
        .map_err(|_| EchoError::Timeout("Write timeout".to_string()))?
        .map_err(EchoError::Tcp)?;

        Ok(())
    }

    /// Receives one echoed line with the terminator stripped.
    ///
    /// Returns `Ok(None)` when the server closed the connection.
    pub async fn recv_line(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();
        let n = timeout(
            self.config.read_timeout,
            self.reader.read_until(b'\n', &mut line),
        )
        .await
        .map_err(|_| EchoError::Timeout("Read timeout".to_string()))?
        .map_err(EchoError::Tcp)?;

        if n == 0 {
            return Ok(None);
        }

        if line.last() == Some(&b'\n') {
            line.pop();
        }
        let text = String::from_utf8(line).map_err(EchoError::Utf8)?;
        Ok(Some(text))
    }
}

#[async_trait]
impl EchoClient for TcpEchoClient {
    /// Sends raw bytes and reads back an equally sized response.
    ///
    /// The payload should be newline-terminated; the server echoes lines,
    /// so an unterminated payload would never be answered.
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        timeout(self.config.write_timeout, async {
            self.writer.write_all(data).await?;
            self.writer.flush().await
        })
        .await
        .map_err(|_| EchoError::Timeout("Write timeout".to_string()))?
        .map_err(EchoError::Tcp)?;

        let mut response = BytesMut::with_capacity(self.config.buffer_size);
        let mut buffer = vec![0u8; self.config.buffer_size];

        while response.len() < data.len() {
            let n = timeout(self.config.read_timeout, self.reader.read(&mut buffer))
                .await
                .map_err(|_| {
                    EchoError::Timeout(format!(
                        "Read timeout: expected {} bytes, got {}",
                        data.len(),
                        response.len()
                    ))
                })?
                .map_err(EchoError::Tcp)?;

            if n == 0 {
                // Server closed mid-response, return what we have
                break;
            }
            response.extend_from_slice(&buffer[..n]);
        }

        Ok(response.to_vec())
    }
}
