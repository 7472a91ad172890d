use std::net::{Ipv4Addr, SocketAddr};

/// TCP listener configuration
///
/// TCP reads and writes carry no timeouts: a session blocks on its peer
/// indefinitely and ends only on EOF, an I/O error, or the stop command.
///
/// # Examples
///
/// ```
/// use echoportd::tcp::TcpConfig;
///
/// let config = TcpConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Address to bind the listener to
    pub bind_addr: SocketAddr,
}

impl TcpConfig {
    /// Configuration listening on all IPv4 interfaces at the given port
    pub fn for_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
        }
    }
}
