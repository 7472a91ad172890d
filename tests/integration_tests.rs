use color_eyre::eyre::Result;
use echoportd::common::{EchoClient, EchoServerTrait};
use echoportd::{
    Service, ServiceConfig, TcpConfig, TcpEchoClient, TcpEchoServer, UdpConfig, UdpEchoClient,
    UdpEchoServer,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tokio::time::timeout;

type ServerHandle = JoinHandle<echoportd::Result<()>>;

/// Starts a TCP supervisor on an ephemeral port and returns its shutdown
/// sender, join handle, and address.
async fn start_tcp_server() -> Result<(tokio::sync::broadcast::Sender<()>, ServerHandle, SocketAddr)>
{
    // Bind first to learn a free port, then hand the address to the server
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let server = TcpEchoServer::new(TcpConfig { bind_addr: addr });
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok((shutdown, handle, addr))
}

/// Starts a UDP supervisor on an ephemeral port
async fn start_udp_server() -> Result<(tokio::sync::broadcast::Sender<()>, ServerHandle, SocketAddr)>
{
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let addr = socket.local_addr()?;
    drop(socket);

    let config = UdpConfig {
        bind_addr: addr,
        ..UdpConfig::default()
    };
    let server = UdpEchoServer::new(config);
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok((shutdown, handle, addr))
}

/// Reads from the stream until `expected` bytes have accumulated
async fn read_exactly(stream: &mut TcpStream, expected: usize) -> Result<Vec<u8>> {
    let mut collected = Vec::with_capacity(expected);
    let mut buffer = [0u8; 1024];
    while collected.len() < expected {
        let n = timeout(Duration::from_secs(2), stream.read(&mut buffer)).await??;
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buffer[..n]);
    }
    Ok(collected)
}

#[tokio::test]
async fn tcp_echoes_single_line() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut client = TcpEchoClient::connect(addr).await?;
    client.send_line("hello").await?;
    assert_eq!(client.recv_line().await?.as_deref(), Some("hello"));

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_echo_is_byte_exact_including_terminator() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"hello\r\n").await?;
    // The trimmed content is logged, but the echo is the original bytes
    assert_eq!(read_exactly(&mut stream, 7).await?, b"hello\r\n");

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_echoes_multiple_sequential_lines() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut client = TcpEchoClient::connect(addr).await?;
    for i in 0..5 {
        let message = format!("message number {i}");
        client.send_line(&message).await?;
        assert_eq!(client.recv_line().await?.as_deref(), Some(message.as_str()));
    }

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_does_not_lose_buffered_lines() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    // Two lines in one segment: the second line sits in the session's
    // read buffer while the first is being echoed and must not be lost
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"one\ntwo\n").await?;
    assert_eq!(read_exactly(&mut stream, 8).await?, b"one\ntwo\n");

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_stop_closes_connection_without_echo() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"STOP\n").await?;

    let mut buffer = [0u8; 16];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buffer)).await??;
    assert_eq!(n, 0, "expected the server to close without echoing");

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_stop_matches_after_whitespace_trim() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"  STOP \n").await?;

    let mut buffer = [0u8; 16];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buffer)).await??;
    assert_eq!(n, 0);

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_stop_match_is_case_sensitive() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut client = TcpEchoClient::connect(addr).await?;
    client.send_line("stop").await?;
    assert_eq!(client.recv_line().await?.as_deref(), Some("stop"));
    client.send_line("STOPX").await?;
    assert_eq!(client.recv_line().await?.as_deref(), Some("STOPX"));

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_concurrent_clients_receive_only_their_own_data() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut handles = Vec::new();
    for i in 0..5 {
        let handle = tokio::spawn(async move {
            let mut client = TcpEchoClient::connect(addr).await?;
            for round in 0..3 {
                let message = format!("client {i} round {round}");
                client.send_line(&message).await?;
                let response = client.recv_line().await?;
                assert_eq!(response.as_deref(), Some(message.as_str()));
            }
            Ok::<(), echoportd::EchoError>(())
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await??;
    }

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_session_survives_other_sessions_ending() -> Result<()> {
    let (shutdown, _handle, addr) = start_tcp_server().await?;

    let mut persistent = TcpEchoClient::connect(addr).await?;
    persistent.send_line("first").await?;
    assert_eq!(persistent.recv_line().await?.as_deref(), Some("first"));

    // Another session stops; the first one must be unaffected
    let mut stopping = TcpStream::connect(addr).await?;
    stopping.write_all(b"STOP\n").await?;
    let mut buffer = [0u8; 8];
    let n = timeout(Duration::from_secs(2), stopping.read(&mut buffer)).await??;
    assert_eq!(n, 0);

    persistent.send_line("second").await?;
    assert_eq!(persistent.recv_line().await?.as_deref(), Some("second"));

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn tcp_supervisor_stops_on_shutdown_signal() -> Result<()> {
    let (shutdown, handle, _addr) = start_tcp_server().await?;

    let _ = shutdown.send(());
    let result = timeout(Duration::from_secs(2), handle).await??;
    assert!(result.is_ok());
    Ok(())
}

#[tokio::test]
async fn tcp_bind_failure_is_fatal_for_that_supervisor() -> Result<()> {
    // Hold the port so the supervisor cannot bind it
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = TcpEchoServer::new(TcpConfig { bind_addr: addr });
    let result = timeout(Duration::from_secs(2), server.run()).await?;
    assert!(result.is_err());

    drop(listener);
    Ok(())
}

#[tokio::test]
async fn udp_replies_with_trimmed_payload_and_newline() -> Result<()> {
    let (shutdown, _handle, addr) = start_udp_server().await?;

    let mut client = UdpEchoClient::connect(addr).await?;
    assert_eq!(client.echo(b"ping").await?, b"ping\n");
    assert_eq!(client.echo(b"  padded  \n").await?, b"padded\n");

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn udp_reply_comes_from_the_bound_port() -> Result<()> {
    let (shutdown, _handle, addr) = start_udp_server().await?;

    let mut client = UdpEchoClient::connect(addr).await?;
    let (reply, from) = client.exchange(b"where from").await?;
    assert_eq!(reply, b"where from\n");
    assert_eq!(from, addr);

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn udp_datagrams_are_independent_exchanges() -> Result<()> {
    let (shutdown, _handle, addr) = start_udp_server().await?;

    // Two sockets interleaving against one receive loop
    let mut first = UdpEchoClient::connect(addr).await?;
    let mut second = UdpEchoClient::connect(addr).await?;

    assert_eq!(first.echo(b"alpha").await?, b"alpha\n");
    assert_eq!(second.echo(b"beta").await?, b"beta\n");
    assert_eq!(first.echo(b"gamma").await?, b"gamma\n");

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn udp_oversized_datagram_is_truncated_to_buffer() -> Result<()> {
    let (shutdown, _handle, addr) = start_udp_server().await?;

    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let payload = vec![b'x'; 1500];
    socket.send_to(&payload, addr).await?;

    let mut buffer = vec![0u8; 4096];
    let (n, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buffer)).await??;

    // 1024-byte receive buffer, so the reply is the truncated payload
    // plus the trailing newline
    let mut expected = vec![b'x'; 1024];
    expected.push(b'\n');
    assert_eq!(&buffer[..n], &expected[..]);

    let _ = shutdown.send(());
    Ok(())
}

#[tokio::test]
async fn udp_supervisor_stops_on_shutdown_signal() -> Result<()> {
    let (shutdown, handle, _addr) = start_udp_server().await?;

    let _ = shutdown.send(());
    let result = timeout(Duration::from_secs(2), handle).await??;
    assert!(result.is_ok());
    Ok(())
}

#[tokio::test]
async fn udp_bind_failure_is_fatal_for_that_supervisor() -> Result<()> {
    let holder = UdpSocket::bind("127.0.0.1:0").await?;
    let addr = holder.local_addr()?;

    let config = UdpConfig {
        bind_addr: addr,
        ..UdpConfig::default()
    };
    let server = UdpEchoServer::new(config);
    let result = timeout(Duration::from_secs(2), server.run()).await?;
    assert!(result.is_err());

    drop(holder);
    Ok(())
}

#[tokio::test]
async fn service_launches_every_configured_binding() -> Result<()> {
    // Reserve one port per protocol, then configure the service with them
    let tcp_probe = TcpListener::bind("127.0.0.1:0").await?;
    let tcp_port = tcp_probe.local_addr()?.port();
    drop(tcp_probe);
    let udp_probe = UdpSocket::bind("127.0.0.1:0").await?;
    let udp_port = udp_probe.local_addr()?.port();
    drop(udp_probe);

    let config = ServiceConfig::from_lists(
        Some(&tcp_port.to_string()),
        Some(&udp_port.to_string()),
    )?;
    let service = Service::launch(config);
    assert_eq!(service.listener_count(), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut tcp_client = TcpEchoClient::connect(([127, 0, 0, 1], tcp_port).into()).await?;
    tcp_client.send_line("over tcp").await?;
    assert_eq!(tcp_client.recv_line().await?.as_deref(), Some("over tcp"));

    let mut udp_client = UdpEchoClient::connect(([127, 0, 0, 1], udp_port).into()).await?;
    assert_eq!(udp_client.echo(b"over udp").await?, b"over udp\n");

    service.shutdown();
    timeout(Duration::from_secs(2), service.join()).await?;
    Ok(())
}

#[tokio::test]
async fn malformed_configuration_aborts_before_any_listener_binds() -> Result<()> {
    // The whole config is rejected even though the UDP list is valid, so
    // no supervisor is ever launched
    let result = ServiceConfig::from_lists(Some("8080|not-a-port"), Some("9090"));
    assert!(result.is_err());
    Ok(())
}
