use crate::{EchoError, Result};
use std::env;
use std::fmt;

/// Environment variable holding the `|`-delimited TCP port list
pub const TCP_PORTS_VAR: &str = "DUMMY_TCPPORTS";
/// Environment variable holding the `|`-delimited UDP port list
pub const UDP_PORTS_VAR: &str = "DUMMY_UDPPORTS";

/// Transport protocol of a configured listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// One configured listener: a protocol plus a port number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub protocol: Protocol,
    pub port: u16,
}

/// Startup configuration for the whole service, validated once before any
/// listener binds.
///
/// # Examples
///
/// ```
/// use echoportd::config::{Protocol, ServiceConfig};
///
/// let config = ServiceConfig::from_lists(Some("8080|8081"), Some("9090")).unwrap();
/// assert_eq!(config.bindings.len(), 3);
/// assert_eq!(config.bindings[2].protocol, Protocol::Udp);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub bindings: Vec<PortBinding>,
}

impl ServiceConfig {
    /// Reads the port lists from the process environment.
    ///
    /// An unset variable contributes zero listeners for that protocol. A set
    /// variable must parse in full; any bad segment aborts startup.
    pub fn from_env() -> Result<Self> {
        let tcp = env::var(TCP_PORTS_VAR).ok();
        let udp = env::var(UDP_PORTS_VAR).ok();
        Self::from_lists(tcp.as_deref(), udp.as_deref())
    }

    /// Builds the configuration from raw `|`-delimited lists, `None`
    /// standing in for an unset variable.
    pub fn from_lists(tcp_ports: Option<&str>, udp_ports: Option<&str>) -> Result<Self> {
        let mut bindings = Vec::new();

        if let Some(list) = tcp_ports {
            for port in parse_port_list(TCP_PORTS_VAR, list)? {
                bindings.push(PortBinding {
                    protocol: Protocol::Tcp,
                    port,
                });
            }
        }

        if let Some(list) = udp_ports {
            for port in parse_port_list(UDP_PORTS_VAR, list)? {
                bindings.push(PortBinding {
                    protocol: Protocol::Udp,
                    port,
                });
            }
        }

        Ok(Self { bindings })
    }
}

/// Parses a `|`-delimited port list.
///
/// Every segment must be a non-zero `u16`. The empty string splits to a
/// single empty segment and is therefore rejected, matching the contract
/// that a present-but-empty variable is a fatal startup error.
pub fn parse_port_list(name: &str, value: &str) -> Result<Vec<u16>> {
    value
        .split('|')
        .map(|segment| {
            let port: u16 = segment.parse().map_err(|_| {
                EchoError::Config(format!("{name}: invalid port entry {segment:?}"))
            })?;
            if port == 0 {
                return Err(EchoError::Config(format!(
                    "{name}: port 0 is not a bindable port"
                )));
            }
            Ok(port)
        })
        .collect()
}
