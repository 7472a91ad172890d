#[cfg(test)]
mod tests {
    use crate::common::traits::EchoServerTrait;
    use crate::tcp::STOP_WORD;
    use crate::{TcpConfig, TcpEchoServer};

    #[tokio::test]
    async fn test_config_default() {
        let config = TcpConfig::default();
        assert_eq!(config.bind_addr.port(), 0);
        assert!(config.bind_addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_config_for_port() {
        let config = TcpConfig::for_port(8080);
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[tokio::test]
    async fn test_echo_server_new() {
        let config = TcpConfig::default();
        let server = TcpEchoServer::new(config);
        assert!(server.shutdown_signal().receiver_count() == 0);
    }

    #[test]
    fn test_stop_word_is_exact() {
        assert_eq!(STOP_WORD, "STOP");
    }
}
