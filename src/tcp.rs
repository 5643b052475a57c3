//! Connection-oriented byte-stream client socket.

use crate::address::{self, Address, InternetProtocolVersion, ResolveHints, SocketKind};
use crate::compat;
use crate::error::Error;
use socket2::Socket;
use std::io::{Read, Write};

/// The default readiness-poll timeout used by [`TcpSocket::ready`] and the
/// framing helpers.
pub const DEFAULT_TIMEOUT_US: u64 = 100;

/// A connected TCP byte-stream endpoint.
///
/// Owns exactly one OS descriptor and is not `Clone`: copying would alias
/// the same descriptor and make `close` on one copy invalidate the others.
/// Share a `TcpSocket` by reference, or use [`TcpSocket::try_clone`] to
/// obtain a genuinely independent duplicate descriptor.
#[derive(Debug)]
pub struct TcpSocket {
    socket: Option<Socket>,
    hostname: String,
    port: u16,
    version: InternetProtocolVersion,
    remote_addr: Option<Address>,
}

impl TcpSocket {
    /// Connects to `hostname:port`, trying every resolved candidate address
    /// in order until one connects.
    ///
    /// An empty `hostname` is rejected as [`Error::Argument`] before any
    /// syscall.
    pub fn connect(hostname: &str, port: u16, preferred: InternetProtocolVersion) -> Result<Self, Error> {
        if hostname.is_empty() {
            return Err(Error::Argument("hostname must not be empty".to_string()));
        }
        compat::ensure_initialised()?;

        let hints = ResolveHints::tcp(preferred, false);
        let candidates = address::resolve(Some(hostname), port, &hints)?;
        if candidates.is_empty() {
            return Err(Error::Resolve {
                code: -1,
                message: format!("no addresses found for {hostname}"),
            });
        }

        let mut last_err = None;
        for candidate in &candidates {
            log::debug!("tcp connect: trying {candidate}");
            match Self::try_connect_one(candidate) {
                Ok(socket) => {
                    let version = InternetProtocolVersion::of(candidate);
                    log::info!("tcp connect: connected to {candidate}");
                    return Ok(Self {
                        socket: Some(socket),
                        hostname: hostname.to_string(),
                        port,
                        version,
                        remote_addr: Some(*candidate),
                    });
                }
                Err(e) => {
                    log::warn!("tcp connect: candidate {candidate} failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(Error::Connect {
            code: -1,
            message: format!("no candidate address for {hostname}:{port} connected"),
        }))
    }

    fn try_connect_one(candidate: &Address) -> Result<Socket, Error> {
        let socket = address::new_socket(candidate, SocketKind::Stream)?;
        compat::suppress_sigpipe(&socket)?;
        socket
            .connect(&(*candidate).into())
            .map_err(|_| Error::connect_from_os(&candidate.to_string()))?;
        Ok(socket)
    }

    /// Adopts an already-accepted descriptor. Used internally by
    /// [`crate::server::TcpServerSocket::accept`]; records metadata without
    /// touching the descriptor.
    pub(crate) fn from_accepted(
        socket: Socket,
        hostname: String,
        port: u16,
        version: InternetProtocolVersion,
        remote_addr: Address,
    ) -> Self {
        Self {
            socket: Some(socket),
            hostname,
            port,
            version,
            remote_addr: Some(remote_addr),
        }
    }

    fn socket(&self) -> Result<&Socket, Error> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// Sends `buf`, returning `(true, bytes_sent)` on success or
    /// `(false, -1)` on error. Wire-level failures are reported as a tuple,
    /// not a `Result`, so callers can decide retry policy themselves.
    pub fn send(&self, buf: &[u8], flags: i32) -> (bool, i64) {
        let Ok(socket) = self.socket() else {
            return (false, -1);
        };
        let send_flags = flags | compat::nosignal_send_flag();
        match socket.send_with_flags(buf, send_flags) {
            Ok(n) => (true, n as i64),
            Err(_) => (false, -1),
        }
    }

    /// Wraps [`compat::poll_one`] on the owned descriptor.
    pub fn poll_one(&self, timeout_us: u64) -> i32 {
        match &self.socket {
            Some(socket) => compat::poll_one(socket, timeout_us),
            None => -1,
        }
    }

    /// True iff a poll of `timeout_us` returns `>0` (data ready, or EOF).
    pub fn ready(&self, timeout_us: u64) -> bool {
        self.poll_one(timeout_us) > 0
    }

    /// A weak liveness probe: true iff a poll of `timeout_us` does not
    /// return `-1`. This cannot reliably detect remote-initiated half
    /// close on many OSes; treat it as advisory only.
    pub fn connected(&self, timeout_us: u64) -> bool {
        self.poll_one(timeout_us) != -1
    }

    /// Reads up to `n` bytes into a fresh `Vec<u8>`, looping across short
    /// reads while the socket is [`ready`](Self::ready).
    ///
    /// Returns the raw bytes received, unmodified — this is the
    /// byte-preserving counterpart of [`receive_amount_buf`](Self::receive_amount_buf)
    /// and round-trips any byte string, including non-UTF-8 data.
    pub fn receive_amount(&self, n: usize, flags: i32) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        let got = self.receive_amount_buf(&mut buf, flags);
        let got = got.max(0) as usize;
        buf.truncate(got);
        buf
    }

    /// Buffer-based form of [`receive_amount`](Self::receive_amount):
    /// attempts to fill `buf` completely, stopping early on a read
    /// returning `<1` byte (peer closed or error) and returning the count
    /// actually received.
    pub fn receive_amount_buf(&self, buf: &mut [u8], flags: i32) -> i64 {
        let Ok(socket) = self.socket() else {
            return -1;
        };
        let mut total = 0usize;
        while total < buf.len() {
            if compat::poll_one(socket, DEFAULT_TIMEOUT_US) <= 0 {
                break;
            }
            let chunk = &mut buf[total..];
            match socket.recv_with_flags(unsafe_uninit(chunk), flags) {
                Ok(n) if n > 0 => total += n,
                _ => break,
            }
        }
        total as i64
    }

    /// Reads one byte at a time while [`ready`](Self::ready), stopping when
    /// `delimiter` is read (the delimiter itself is discarded) or the
    /// stream goes not-ready. Rejects a null-byte delimiter as
    /// [`Error::Argument`].
    pub fn receive_to_delimiter(&self, delimiter: u8, flags: i32) -> Result<Vec<u8>, Error> {
        if delimiter == 0 {
            return Err(Error::Argument("delimiter must not be the null byte".to_string()));
        }
        let Ok(socket) = self.socket() else {
            return Err(Error::Closed);
        };
        let mut collected = Vec::new();
        let mut byte = [0u8; 1];
        while compat::poll_one(socket, DEFAULT_TIMEOUT_US) > 0 {
            match socket.recv_with_flags(unsafe_uninit(&mut byte), flags) {
                Ok(1) if byte[0] == delimiter => break,
                Ok(1) => collected.push(byte[0]),
                _ => break,
            }
        }
        Ok(collected)
    }

    /// Loops while [`ready`](Self::ready), polling to determine an
    /// available byte count and draining it via
    /// [`receive_amount`](Self::receive_amount), concatenating chunks.
    ///
    /// Terminates when `ready` goes false, or a chunk begins with a null
    /// byte — the latter is a deliberately preserved quirk, not a
    /// validation rule.
    pub fn receive_all(&self, timeout_us: u64, flags: i32) -> Vec<u8> {
        let Some(socket) = self.socket.as_ref() else {
            return Vec::new();
        };
        let mut result = Vec::new();
        while compat::poll_one(socket, timeout_us) > 0 {
            let available = available_bytes(socket);
            if available == 0 {
                break;
            }
            let chunk = self.receive_amount(available, flags);
            if chunk.first() == Some(&0) {
                break;
            }
            if chunk.is_empty() {
                break;
            }
            result.extend_from_slice(&chunk);
        }
        result
    }

    /// Shortcut for `receive_amount(1, flags)`; returns `None` on an empty
    /// read (peer closed or nothing ready).
    pub fn get(&self, flags: i32) -> Option<u8> {
        let mut buf = [0u8; 1];
        if self.receive_amount_buf(&mut buf, flags) == 1 {
            Some(buf[0])
        } else {
            None
        }
    }

    /// Closes the descriptor. Idempotent: calling this on an already-closed
    /// socket is silently accepted.
    pub fn close(&mut self) {
        self.socket = None;
    }

    /// Produces a genuinely independent duplicate descriptor.
    pub fn try_clone(&self) -> Result<Self, Error> {
        let socket = self.socket()?.try_clone().map_err(Error::from)?;
        Ok(Self {
            socket: Some(socket),
            hostname: self.hostname.clone(),
            port: self.port,
            version: self.version,
            remote_addr: self.remote_addr,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn internet_protocol_version(&self) -> InternetProtocolVersion {
        self.version
    }

    pub fn remote_address(&self) -> Option<Address> {
        self.remote_addr
    }

    /// The address of this end of the connection, as reported by the OS.
    pub fn local_address(&self) -> Result<Address, Error> {
        address::local_address_of(self.socket()?)
    }

    /// True iff this socket's descriptor has been closed.
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl Write for TcpSocket {
    /// Routed through `send_with_flags` with [`compat::nosignal_send_flag`]
    /// rather than `socket2::Socket::write`, so writing to a peer that has
    /// closed its end reports an `io::Error` instead of raising `SIGPIPE`
    /// on platforms where that flag, not `SO_NOSIGPIPE`, is the mechanism.
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let socket = self.socket.as_ref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "socket is closed")
        })?;
        socket.send_with_flags(buf, compat::nosignal_send_flag())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for TcpSocket {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let socket = self.socket.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "socket is closed")
        })?;
        socket.read(buf)
    }
}

/// Asks the OS how many bytes are currently available to read without
/// blocking, used by [`TcpSocket::receive_all`].
fn available_bytes(socket: &Socket) -> usize {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = socket.as_raw_fd();
        let mut count: libc::c_int = 0;
        let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count) };
        if rc == 0 && count > 0 {
            count as usize
        } else {
            1
        }
    }
    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawSocket;
        use windows_sys::Win32::Networking::WinSock::{ioctlsocket, FIONREAD};
        let raw = socket.as_raw_socket();
        let mut count: u32 = 0;
        let rc = unsafe { ioctlsocket(raw as usize, FIONREAD, &mut count) };
        if rc == 0 && count > 0 {
            count as usize
        } else {
            1
        }
    }
}

/// `socket2::Socket::recv_with_flags` wants `&mut [MaybeUninit<u8>]`; this
/// crate only ever reads into already-initialised, caller-owned buffers, so
/// the conversion is a safe reinterpretation of the same bytes.
fn unsafe_uninit(buf: &mut [u8]) -> &mut [std::mem::MaybeUninit<u8>] {
    // SAFETY: `u8` and `MaybeUninit<u8>` share layout; the slice is already
    // initialised, which is strictly stronger than what `MaybeUninit`
    // requires of the callee.
    unsafe { &mut *(buf as *mut [u8] as *mut [std::mem::MaybeUninit<u8>]) }
}
