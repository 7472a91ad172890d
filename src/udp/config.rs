use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// UDP listener configuration
///
/// Datagrams larger than `buffer_size` are truncated per packet-socket
/// semantics. Reads block indefinitely; only the echo reply carries a
/// deadline.
///
/// # Examples
///
/// ```
/// use echoportd::udp::UdpConfig;
/// use std::time::Duration;
///
/// let config = UdpConfig {
///     bind_addr: "127.0.0.1:9090".parse().unwrap(),
///     buffer_size: 1024,
///     write_timeout: Duration::from_secs(5),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Address to bind the socket to
    pub bind_addr: SocketAddr,
    /// Receive buffer capacity in bytes
    pub buffer_size: usize,
    /// Deadline for writing an echo reply
    pub write_timeout: Duration,
}

impl UdpConfig {
    /// Configuration listening on all IPv4 interfaces at the given port
    pub fn for_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ..Self::default()
        }
    }
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            buffer_size: 1024,
            write_timeout: Duration::from_secs(5),
        }
    }
}
