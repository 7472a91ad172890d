pub mod client;
pub mod config;
pub mod server;
pub mod tests;

pub use client::{ClientConfig, TcpEchoClient};
pub use config::TcpConfig;
pub use server::{STOP_WORD, TcpEchoServer};
