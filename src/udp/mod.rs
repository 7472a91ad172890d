pub mod client;
pub mod config;
pub mod server;

pub use client::UdpEchoClient;
pub use config::UdpConfig;
pub use server::UdpEchoServer;
