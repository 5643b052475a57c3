//! End-to-end TCP client/server scenarios over loopback.

use socketcore::prelude::*;
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn loopback_tcp_echo() {
    init_logging();
    let server = TcpServerSocket::bind(None, 0, 20, InternetProtocolVersion::V4).unwrap();
    let port = server.port();
    assert_ne!(port, 0);

    let handle = thread::spawn(move || {
        let peer = server.accept(5_000_000).unwrap();
        let received = peer.receive_amount(4, 0);
        assert_eq!(received, b"Test");
    });

    // Give the listener a moment to reach `accept`.
    thread::sleep(Duration::from_millis(50));
    let client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4).unwrap();
    let (ok, sent) = client.send(b"Test", 0);
    assert!(ok);
    assert_eq!(sent, 4);

    handle.join().unwrap();
}

#[test]
fn loopback_tcp_ipv6_echo() {
    init_logging();
    let server = TcpServerSocket::bind(None, 0, 20, InternetProtocolVersion::V6).unwrap();
    let port = server.port();

    let handle = thread::spawn(move || {
        let peer = server.accept(5_000_000).unwrap();
        let received = peer.receive_amount(4, 0);
        assert_eq!(received, b"Test");
    });

    thread::sleep(Duration::from_millis(50));
    let client = TcpSocket::connect("::1", port, InternetProtocolVersion::V6).unwrap();
    let (ok, sent) = client.send(b"Test", 0);
    assert!(ok);
    assert_eq!(sent, 4);

    handle.join().unwrap();
}

#[test]
fn bind_port_zero_reports_nonzero_listening_port() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    assert_ne!(server.port(), 0);
    assert_eq!(server.local_address().unwrap().port(), server.port());
}

#[test]
fn close_then_send_reports_failure() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let port = server.port();
    let handle = thread::spawn(move || {
        let _peer = server.accept(5_000_000).unwrap();
    });
    thread::sleep(Duration::from_millis(50));

    let mut client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4).unwrap();
    handle.join().unwrap();
    client.close();
    assert!(client.is_closed());

    let (ok, bytes) = client.send(b"data", 0);
    assert!(!ok);
    assert_eq!(bytes, -1);
}

#[test]
fn connect_with_empty_hostname_is_argument_error() {
    let err = TcpSocket::connect("", 80, InternetProtocolVersion::Any).unwrap_err();
    assert!(matches!(err, socketcore::Error::Argument(_)));
}

#[test]
fn timeout_accept_elapses_cleanly() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let start = std::time::Instant::now();
    let result = server.accept(1_000_000);
    let elapsed = start.elapsed();
    assert!(matches!(result, Err(socketcore::Error::Timeout)));
    assert!(elapsed >= Duration::from_millis(900));
}

#[test]
fn round_trip_send_b_plus_delimiter() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let port = server.port();

    let handle = thread::spawn(move || {
        let peer = server.accept(5_000_000).unwrap();
        let result = peer.receive_to_delimiter(b'\n', 0).unwrap();
        assert_eq!(result, b"hello world");
    });

    thread::sleep(Duration::from_millis(50));
    let client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4).unwrap();
    let (ok, _) = client.send(b"hello world\n", 0);
    assert!(ok);

    handle.join().unwrap();
}

#[test]
fn delimiter_framing_leaves_remainder_available() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let port = server.port();

    let handle = thread::spawn(move || {
        let peer = server.accept(5_000_000).unwrap();
        let head = peer.receive_to_delimiter(b'&', 0).unwrap();
        assert_eq!(head, b"foo");
        assert!(peer.ready(200_000));
        let tail = peer.receive_amount(3, 0);
        assert_eq!(tail, b"bar");
    });

    thread::sleep(Duration::from_millis(50));
    let client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4).unwrap();
    let (ok, _) = client.send(b"foo&bar", 0);
    assert!(ok);

    handle.join().unwrap();
}

#[test]
fn receive_amount_round_trips_non_utf8_bytes() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let port = server.port();
    let payload: Vec<u8> = vec![0xFF, 0x00 + 1, 0xC0, 0x80, 0xFE];

    let handle = thread::spawn(move || {
        let peer = server.accept(5_000_000).unwrap();
        let received = peer.receive_amount(5, 0);
        assert_eq!(received, vec![0xFFu8, 0x01, 0xC0, 0x80, 0xFE]);
    });

    thread::sleep(Duration::from_millis(50));
    let client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4).unwrap();
    let (ok, _) = client.send(&payload, 0);
    assert!(ok);

    handle.join().unwrap();
}

#[test]
fn receive_to_delimiter_round_trips_non_utf8_bytes() {
    let server = TcpServerSocket::bind(None, 0, 10, InternetProtocolVersion::V4).unwrap();
    let port = server.port();

    let handle = thread::spawn(move || {
        let peer = server.accept(5_000_000).unwrap();
        let result = peer.receive_to_delimiter(b'\n', 0).unwrap();
        assert_eq!(result, vec![0xFFu8, 0xFE, 0x80]);
    });

    thread::sleep(Duration::from_millis(50));
    let client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4).unwrap();
    let (ok, _) = client.send(&[0xFF, 0xFE, 0x80, b'\n'], 0);
    assert!(ok);

    handle.join().unwrap();
}
