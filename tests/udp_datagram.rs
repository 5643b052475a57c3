//! End-to-end UDP datagram scenarios over loopback.

use socketcore::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn udp_datagram_round_trip_preserves_peer_address() {
    let mut a = UdpSocket::new();
    let (ok, addr_a) = a.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();
    assert!(ok);
    let port_a = addr_a.port();
    assert_ne!(port_a, 0);

    let mut b = UdpSocket::new();
    b.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();

    let (ok, sent, dest) = b
        .send_to_host("localhost", port_a, b"test~test", 0, InternetProtocolVersion::V4)
        .unwrap();
    assert!(ok);
    assert_eq!(sent, 9);
    assert_eq!(dest.port(), port_a);

    let (data, meta) = a.receive_from(9, 0);
    assert_eq!(data.as_deref(), Some("test~test"));
    let (count, peer) = meta.unwrap();
    assert_eq!(count, 9);
    // The datagram arrived from B's ephemeral send port, not A's bound port.
    assert_eq!(peer.ip().to_string(), "127.0.0.1");
    assert_ne!(peer.port(), port_a);
}

#[test]
fn bind_is_idempotent() {
    let mut socket = UdpSocket::new();
    let (_, first) = socket.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();
    let (_, second) = socket.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn two_udp_sockets_share_a_port_only_with_reuse_hook() {
    let mut a = UdpSocket::new();
    let (_, addr) = a.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();
    let port = addr.port();
    a.close();

    // Without a hook, rebinding a just-freed port generally succeeds once
    // the first socket is closed; to meaningfully exercise "same port,
    // concurrently held", bind both through the SO_REUSEADDR hook.
    let reuse_hook: SocketHook = Arc::new(|socket| {
        socket.set_reuse_address(true).map_err(|_| {
            socketcore::Error::Setup {
                code: -1,
                message: "SO_REUSEADDR failed".to_string(),
            }
        })
    });

    let mut first = UdpSocket::new();
    first
        .bind(None, port, InternetProtocolVersion::V4, Some(reuse_hook.clone()))
        .unwrap();

    let mut second = UdpSocket::new();
    let result = second.bind(None, port, InternetProtocolVersion::V4, Some(reuse_hook));
    assert!(result.is_ok());

    first.close();
    second.close();
}

#[test]
fn receive_from_respects_buffer_size_truncation() {
    let mut receiver = UdpSocket::new();
    let (_, addr) = receiver.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();
    let port = addr.port();

    let mut sender = UdpSocket::new();
    sender.bind(None, 0, InternetProtocolVersion::V4, None).unwrap();
    let (ok, _) = sender.send_to(b"0123456789", addr, 0);
    assert!(ok);
    let _ = port;

    thread::sleep(Duration::from_millis(20));
    let (data, meta) = receiver.receive_from(4, 0);
    assert_eq!(data.as_deref(), Some("0123"));
    assert_eq!(meta.unwrap().0, 4);
}

#[test]
fn ephemeral_tcp_and_udp_ports_coexist() {
    let tcp_server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let port = tcp_server.port();

    let mut udp = UdpSocket::new();
    let (ok, addr) = udp.bind(None, port, InternetProtocolVersion::V4, None).unwrap();
    assert!(ok);
    assert_eq!(addr.port(), port);
}
