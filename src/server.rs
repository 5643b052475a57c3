//! Listening endpoint that accepts incoming TCP connections.

use crate::address::{self, Address, InternetProtocolVersion, ResolveHints, SocketKind};
use crate::compat;
use crate::error::Error;
use crate::tcp::TcpSocket;
use socket2::Socket;

/// A bound, listening TCP socket that produces [`TcpSocket`] connections.
#[derive(Debug)]
pub struct TcpServerSocket {
    socket: Option<Socket>,
    port: u16,
    version: InternetProtocolVersion,
    local_addr: Option<Address>,
}

impl TcpServerSocket {
    /// Builds a listening socket: resolve → create → (`SO_REUSEADDR`, clear
    /// `IPV6_V6ONLY`) → bind → listen.
    ///
    /// Any failure along the way closes the partially built descriptor and
    /// surfaces the specific error kind it failed at.
    pub fn bind(
        local_hostname: Option<&str>,
        port: u16,
        backlog: i32,
        preferred: InternetProtocolVersion,
    ) -> Result<Self, Error> {
        compat::ensure_initialised()?;

        let hints = ResolveHints::tcp(preferred, true);
        let candidates = address::resolve(local_hostname, port, &hints)?;
        let candidate = *candidates.first().ok_or_else(|| Error::Setup {
            code: -1,
            message: "address resolution returned no candidates".to_string(),
        })?;
        let version = InternetProtocolVersion::of(&candidate);

        let socket = address::new_socket(&candidate, SocketKind::Stream)
            .map_err(|_| Error::setup_from_os("socket"))?;

        // SO_REUSEADDR lets a restarted server rebind a recently-closed
        // port without waiting out TIME_WAIT.
        if let Err(e) = socket.set_reuse_address(true) {
            log::warn!("server bind: SO_REUSEADDR failed: {e}");
        }

        // Clear IPV6_V6ONLY so a dual-stack listener also accepts IPv4
        // clients where the OS permits it.
        if matches!(version, InternetProtocolVersion::V6) {
            if let Err(e) = socket.set_only_v6(false) {
                log::warn!("server bind: clearing IPV6_V6ONLY failed: {e}");
            }
        }

        socket
            .bind(&candidate.into())
            .map_err(|_| Error::bind_from_os(&candidate.to_string()))?;

        let bound_addr = if port == 0 {
            address::local_address_of(&socket)?
        } else {
            candidate
        };

        socket
            .listen(backlog)
            .map_err(|_| Error::setup_from_os("listen"))?;

        log::info!("server bind: listening on {bound_addr}, backlog {backlog}");
        Ok(Self {
            socket: Some(socket),
            port: bound_addr.port(),
            version,
            local_addr: Some(bound_addr),
        })
    }

    fn socket(&self) -> Result<&Socket, Error> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// Accepts one pending connection.
    ///
    /// If `timeout_us > 0`, first polls the listening descriptor: a poll
    /// result of `0` surfaces [`Error::Timeout`] (the wait elapsed
    /// cleanly), and `-1` surfaces [`Error::Accept`] (the listener is no
    /// longer valid). With `timeout_us == 0`, `accept` blocks indefinitely.
    pub fn accept(&self, timeout_us: u64) -> Result<TcpSocket, Error> {
        let socket = self.socket()?;

        if timeout_us > 0 {
            match compat::poll_one(socket, timeout_us) {
                0 => return Err(Error::Timeout),
                -1 => {
                    return Err(Error::Accept {
                        code: -1,
                        message: "listening descriptor is not valid".to_string(),
                    })
                }
                _ => {}
            }
        }

        let (accepted, peer) = socket.accept().map_err(|_| Error::accept_from_os("accept"))?;
        let peer_addr = peer.as_socket().ok_or_else(|| Error::Accept {
            code: -1,
            message: "accepted peer address was not IPv4/IPv6".to_string(),
        })?;
        let version = InternetProtocolVersion::of(&peer_addr);
        compat::suppress_sigpipe(&accepted)?;

        log::debug!("server accept: accepted connection from {peer_addr}");
        Ok(TcpSocket::from_accepted(
            accepted,
            address::printable(&peer_addr),
            peer_addr.port(),
            version,
            peer_addr,
        ))
    }

    /// Releases the listening descriptor. Idempotent.
    pub fn close(&mut self) {
        self.socket = None;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn internet_protocol_version(&self) -> InternetProtocolVersion {
        self.version
    }

    pub fn local_address(&self) -> Option<Address> {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_port_zero_assigns_an_ephemeral_port() {
        let server = TcpServerSocket::bind(None, 0, 8, InternetProtocolVersion::V4).unwrap();
        assert_ne!(server.port(), 0);
        assert!(!server.is_closed());
    }

    #[test]
    fn close_is_idempotent() {
        let mut server = TcpServerSocket::bind(None, 0, 8, InternetProtocolVersion::V4).unwrap();
        server.close();
        server.close();
        assert!(server.is_closed());
    }

    #[test]
    fn accept_on_closed_listener_fails() {
        let mut server = TcpServerSocket::bind(None, 0, 8, InternetProtocolVersion::V4).unwrap();
        server.close();
        assert!(server.accept(0).is_err());
    }
}
