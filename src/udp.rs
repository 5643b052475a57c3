//! Connectionless datagram endpoint.

use crate::address::{self, Address, InternetProtocolVersion, ResolveHints, SocketKind};
use crate::compat;
use crate::error::Error;
use socket2::Socket;
use std::sync::Arc;

/// A hook applied to a freshly created raw descriptor just before `bind`
/// (at bind time) or just before an outbound `sendto` (at send time).
///
/// Used by callers who need to set options this crate does not expose
/// directly, such as `SO_REUSEADDR` or clearing `IPV6_V6ONLY`, without this
/// crate needing an option-by-option setter for every such flag.
pub type SocketHook = Arc<dyn Fn(&Socket) -> Result<(), Error> + Send + Sync>;

/// A UDP datagram endpoint.
///
/// Default-constructed in the unbound state. [`bind`](Self::bind) creates
/// the receive descriptor; [`send_to`](Self::send_to) creates and tears
/// down a fresh ephemeral descriptor per call rather than reusing the bound
/// receive descriptor, which keeps a bound receiver's port free of
/// outbound traffic.
#[derive(Debug)]
pub struct UdpSocket {
    socket: Option<Socket>,
    bound: bool,
    version: InternetProtocolVersion,
    listening_port: Option<u16>,
    pre_send_hook: Option<SocketHook>,
}

impl Default for UdpSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpSocket {
    /// Constructs an unbound UDP socket.
    pub fn new() -> Self {
        Self {
            socket: None,
            bound: false,
            version: InternetProtocolVersion::Any,
            listening_port: None,
            pre_send_hook: None,
        }
    }

    /// Installs or replaces the hook run just before outbound `sendto`
    /// calls.
    pub fn set_pre_send_hook(&mut self, hook: impl Fn(&Socket) -> Result<(), Error> + Send + Sync + 'static) {
        self.pre_send_hook = Some(Arc::new(hook));
    }

    /// Binds the receive side of this socket.
    ///
    /// Idempotent: calling `bind` again on an already-bound socket returns
    /// the current bound address without effect. If `port` is `0`, the
    /// OS-assigned ephemeral port is discovered via
    /// [`address::local_address_of`] and recorded.
    pub fn bind(
        &mut self,
        hostname: Option<&str>,
        port: u16,
        version: InternetProtocolVersion,
        pre_bind_hook: Option<SocketHook>,
    ) -> Result<(bool, Address), Error> {
        if self.bound {
            let current = address::local_address_of(self.socket()?)?;
            return Ok((true, current));
        }

        compat::ensure_initialised()?;
        let hints = ResolveHints::udp(version, true);
        let candidates = address::resolve(hostname, port, &hints)?;
        let candidate = *candidates.first().ok_or_else(|| Error::Bind {
            code: -1,
            message: "address resolution returned no candidates".to_string(),
        })?;

        let socket = address::new_socket(&candidate, SocketKind::Datagram)?;
        if let Some(hook) = &pre_bind_hook {
            hook(&socket)?;
        }
        socket
            .bind(&candidate.into())
            .map_err(|_| Error::bind_from_os(&candidate.to_string()))?;

        let bound_addr = if port == 0 {
            address::local_address_of(&socket)?
        } else {
            candidate
        };

        self.version = InternetProtocolVersion::of(&candidate);
        self.listening_port = Some(bound_addr.port());
        self.socket = Some(socket);
        self.bound = true;

        log::info!("udp bind: bound to {bound_addr}");
        Ok((true, bound_addr))
    }

    fn socket(&self) -> Result<&Socket, Error> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// Sends `buf` to `addr` on a fresh ephemeral descriptor of `addr`'s
    /// family, returning `(true, bytes_sent)` on success or `(false, -1)`
    /// on error.
    pub fn send_to(&self, buf: &[u8], addr: Address, flags: i32) -> (bool, i64) {
        match self.send_to_inner(buf, addr, flags) {
            Ok(n) => (true, n as i64),
            Err(_) => (false, -1),
        }
    }

    fn send_to_inner(&self, buf: &[u8], addr: Address, flags: i32) -> Result<usize, Error> {
        let socket = address::new_socket(&addr, SocketKind::Datagram)?;
        if let Some(hook) = &self.pre_send_hook {
            hook(&socket)?;
        }
        socket
            .send_to_with_flags(buf, &addr.into(), flags)
            .map_err(|_| Error::setup_from_os("sendto"))
    }

    /// Resolves `(hostname, port)` to a candidate address, then sends via
    /// [`send_to`](Self::send_to), so repeat sends to the same peer can
    /// skip resolution by reusing the returned address.
    pub fn send_to_host(
        &self,
        hostname: &str,
        port: u16,
        buf: &[u8],
        flags: i32,
        version: InternetProtocolVersion,
    ) -> Result<(bool, i64, Address), Error> {
        let hints = ResolveHints::udp(version, false);
        let candidates = address::resolve(Some(hostname), port, &hints)?;
        let addr = *candidates.first().ok_or_else(|| Error::Resolve {
            code: -1,
            message: format!("no addresses found for {hostname}"),
        })?;
        let (ok, sent) = self.send_to(buf, addr, flags);
        Ok((ok, sent, addr))
    }

    /// Receives a single datagram of up to `n` bytes. If the socket is not
    /// bound, `n == 0`, or the socket is not [`ready`](Self::ready),
    /// returns `(None, None)` immediately without a syscall.
    ///
    /// UDP is one-datagram-per-read: bytes beyond `n` in a larger datagram
    /// are discarded by the OS, not buffered for a subsequent read.
    pub fn receive_from(&self, n: usize, flags: i32) -> (Option<String>, Option<(usize, Address)>) {
        if !self.bound || n == 0 || !self.ready(crate::tcp::DEFAULT_TIMEOUT_US) {
            return (None, None);
        }
        let Ok(socket) = self.socket() else {
            return (None, None);
        };
        let mut buf = vec![std::mem::MaybeUninit::new(0u8); n];
        match socket.recv_from_with_flags(&mut buf, flags) {
            Ok((count, sock_addr)) => {
                let Some(peer) = sock_addr.as_socket() else {
                    return (None, None);
                };
                // SAFETY: `recv_from_with_flags` reports `count` initialised bytes.
                let bytes: Vec<u8> = unsafe {
                    buf[..count]
                        .iter()
                        .map(|b| b.assume_init())
                        .collect()
                };
                let text = String::from_utf8_lossy(&bytes).into_owned();
                (Some(text), Some((count, peer)))
            }
            Err(_) => (None, None),
        }
    }

    /// True iff a poll of the bound receive descriptor returns `>0`.
    pub fn ready(&self, timeout_us: u64) -> bool {
        match &self.socket {
            Some(socket) => compat::poll_one(socket, timeout_us) > 0,
            None => false,
        }
    }

    /// Releases the receive descriptor and resets bound state.
    pub fn close(&mut self) {
        self.socket = None;
        self.bound = false;
        self.listening_port = None;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn internet_protocol_version(&self) -> InternetProtocolVersion {
        self.version
    }

    pub fn listening_port(&self) -> Option<u16> {
        self.listening_port
    }

    pub fn local_address(&self) -> Result<Address, Error> {
        address::local_address_of(self.socket()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_socket_is_unbound() {
        let socket = UdpSocket::new();
        assert!(!socket.is_bound());
        assert_eq!(socket.listening_port(), None);
    }

    #[test]
    fn receive_from_without_bind_is_none() {
        let socket = UdpSocket::new();
        let (data, meta) = socket.receive_from(16, 0);
        assert!(data.is_none());
        assert!(meta.is_none());
    }
}
