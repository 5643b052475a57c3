//! A cross-platform, low-level socket library over POSIX/Winsock BSD
//! sockets.
//!
//! `socketcore` provides three synchronous, blocking endpoint types —
//! [`tcp::TcpSocket`] (connect-and-use byte stream), [`udp::UdpSocket`]
//! (connectionless datagrams, peer-address-preserving), and
//! [`server::TcpServerSocket`] (bind/listen/accept) — transparently across
//! IPv4 and IPv6, with hostname resolution handled by [`address::resolve`].
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------+
//! |   TcpSocket   |   UdpSocket   |  TcpServerSocket |
//! +-------------------------------------------------+
//! |                 address (resolution)             |
//! +-------------------------------------------------+
//! |                 compat (OS differences)          |
//! +-------------------------------------------------+
//! ```
//!
//! There is no event loop, no async completion model, and no TLS/HTTP
//! layer in scope — every call here blocks the calling thread. Each socket
//! type owns exactly one OS descriptor; there is no shared mutable state
//! between socket instances.
//!
//! # Quick start
//!
//! ```no_run
//! use socketcore::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let server = TcpServerSocket::bind(None, 0, 20, InternetProtocolVersion::Any)?;
//! let port = server.port();
//!
//! let mut client = TcpSocket::connect("127.0.0.1", port, InternetProtocolVersion::V4)?;
//! let (ok, _) = client.send(b"hello", 0);
//! assert!(ok);
//!
//! let peer = server.accept(1_000_000)?;
//! let received = peer.receive_amount(5, 0);
//! assert_eq!(received, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod compat;
pub mod error;
pub mod prelude;
pub mod server;
pub mod tcp;
pub mod udp;

pub use error::{Error, Result};
