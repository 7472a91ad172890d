//! Top-level launcher composing one supervisor task per configured port.
//!
//! Supervisors are independent leaves: a fatal bind error on one port is
//! logged and ends that supervisor only, while every other listener keeps
//! running.

use crate::common::EchoServerTrait;
use crate::config::{PortBinding, Protocol, ServiceConfig};
use crate::tcp::{TcpConfig, TcpEchoServer};
use crate::udp::{UdpConfig, UdpEchoServer};

use tokio::task::JoinHandle;
use tracing::error;

/// Handle to the set of running port supervisors
pub struct Service {
    supervisors: Vec<(PortBinding, JoinHandle<()>)>,
    shutdowns: Vec<tokio::sync::broadcast::Sender<()>>,
}

impl Service {
    /// Spawns one supervisor per configured binding. Must be called from
    /// within a Tokio runtime.
    pub fn launch(config: ServiceConfig) -> Self {
        let mut supervisors = Vec::with_capacity(config.bindings.len());
        let mut shutdowns = Vec::with_capacity(config.bindings.len());

        for binding in config.bindings {
            let (handle, shutdown) = Self::spawn_supervisor(binding);
            supervisors.push((binding, handle));
            shutdowns.push(shutdown);
        }

        Self {
            supervisors,
            shutdowns,
        }
    }

    fn spawn_supervisor(binding: PortBinding) -> (JoinHandle<()>, tokio::sync::broadcast::Sender<()>) {
        match binding.protocol {
            Protocol::Tcp => {
                let server = TcpEchoServer::new(TcpConfig::for_port(binding.port));
                let shutdown = server.shutdown_signal();
                let handle = tokio::spawn(async move {
                    if let Err(e) = server.run().await {
                        error!(port = binding.port, error = %e, "TCP supervisor terminated");
                    }
                });
                (handle, shutdown)
            }
            Protocol::Udp => {
                let server = UdpEchoServer::new(UdpConfig::for_port(binding.port));
                let shutdown = server.shutdown_signal();
                let handle = tokio::spawn(async move {
                    if let Err(e) = server.run().await {
                        error!(port = binding.port, error = %e, "UDP supervisor terminated");
                    }
                });
                (handle, shutdown)
            }
        }
    }

    /// Number of launched supervisors
    pub fn listener_count(&self) -> usize {
        self.supervisors.len()
    }

    /// Asks every supervisor to stop accepting/receiving. In-flight TCP
    /// sessions are not cancelled and run to their own terminal condition.
    pub fn shutdown(&self) {
        for shutdown in &self.shutdowns {
            let _ = shutdown.send(());
        }
    }

    /// Waits for every supervisor task to finish
    pub async fn join(self) {
        for (binding, handle) in self.supervisors {
            if let Err(e) = handle.await {
                error!(port = binding.port, protocol = %binding.protocol, error = %e, "Supervisor task failed");
            }
        }
    }
}
