//! OS compatibility primitives.
//!
//! Every difference between the POSIX and Winsock socket APIs that the rest
//! of this crate needs is isolated here, so `address`, `tcp`, `udp`, and
//! `server` each contain a single code path instead of branching on
//! `cfg(windows)` throughout.

use crate::error::Error;
use socket2::Socket;
#[cfg(unix)]
use std::os::raw::c_int;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use std::os::unix::io::AsRawFd;
    } else if #[cfg(windows)] {
        use std::os::windows::io::AsRawSocket;
    }
}

/// One-time subsystem initialisation.
///
/// Required on Windows (`WSAStartup`); a no-op everywhere else. Idempotent —
/// call it at the start of every constructor that is about to create a
/// descriptor.
pub fn ensure_initialised() -> Result<(), Error> {
    #[cfg(windows)]
    {
        windows::ensure_wsa_started()?;
    }
    Ok(())
}

/// Returns the current thread's last socket-related OS error as
/// `(code, message)`.
pub fn last_error() -> (i32, String) {
    #[cfg(unix)]
    {
        let err = std::io::Error::last_os_error();
        (err.raw_os_error().unwrap_or(-1), err.to_string())
    }
    #[cfg(windows)]
    {
        windows::last_wsa_error()
    }
}

/// Waits for a single descriptor to become readable, bounded by
/// `timeout_us` microseconds.
///
/// Returns `>0` when data is ready, `0` when the timeout elapsed with
/// nothing ready, and `-1` when the descriptor itself was not valid for
/// polling. Built on `poll`/`WSAPoll` rather than `select`, so it is not
/// bounded by `select`'s `FD_SETSIZE` descriptor-number ceiling.
pub fn poll_one(socket: &Socket, timeout_us: u64) -> i32 {
    #[cfg(unix)]
    {
        let fd = socket.as_raw_fd();
        if fd < 0 {
            return -1;
        }
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = (timeout_us / 1000).max(if timeout_us > 0 { 1 } else { 0 }) as c_int;
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            return -1;
        }
        rc
    }
    #[cfg(windows)]
    {
        windows::poll_one(socket, timeout_us)
    }
}

/// Applies the "do not raise SIGPIPE on this send" policy for stream
/// sockets.
///
/// On Linux/*BSD this is expressed as the `MSG_NOSIGNAL` send flag; on
/// macOS, where that flag does not exist, it is expressed once at
/// creation time via `SO_NOSIGPIPE`. Windows has no `SIGPIPE` concept, so
/// this is a no-op there.
pub fn nosignal_send_flag() -> i32 {
    #[cfg(all(unix, not(target_os = "macos"), not(target_os = "ios")))]
    {
        libc::MSG_NOSIGNAL
    }
    #[cfg(any(target_os = "macos", target_os = "ios", windows))]
    {
        0
    }
}

/// Sets `SO_NOSIGPIPE` on platforms that need it instead of a per-send flag.
pub fn suppress_sigpipe(socket: &Socket) -> Result<(), Error> {
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        use std::os::unix::io::AsRawFd;
        let fd = socket.as_raw_fd();
        let value: c_int = 1;
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_NOSIGPIPE,
                &value as *const _ as *const libc::c_void,
                std::mem::size_of::<c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(Error::setup_from_os("SO_NOSIGPIPE"));
        }
    }
    let _ = socket;
    Ok(())
}

#[cfg(windows)]
mod windows {
    use super::*;
    use std::sync::Once;
    use windows_sys::Win32::Networking::WinSock::{
        WSAGetLastError, WSAPoll, WSAStartup, WSADATA, WSAPOLLFD,
    };

    static WSA_INIT: Once = Once::new();
    static mut WSA_INIT_ERROR: i32 = 0;

    pub(super) fn ensure_wsa_started() -> Result<(), Error> {
        // SAFETY: `Once` guarantees `WSAStartup` runs exactly once and that
        // `WSA_INIT_ERROR` is fully written before any other thread reads it.
        unsafe {
            WSA_INIT.call_once(|| {
                let mut data: WSADATA = std::mem::zeroed();
                WSA_INIT_ERROR = WSAStartup(0x0202, &mut data);
            });
            if WSA_INIT_ERROR != 0 {
                return Err(Error::Setup {
                    code: WSA_INIT_ERROR,
                    message: "WSAStartup failed".to_string(),
                });
            }
        }
        Ok(())
    }

    pub(super) fn last_wsa_error() -> (i32, String) {
        let code = unsafe { WSAGetLastError() };
        (code, std::io::Error::from_raw_os_error(code).to_string())
    }

    pub(super) fn poll_one(socket: &Socket, timeout_us: u64) -> i32 {
        let raw = socket.as_raw_socket();
        let mut pfd = WSAPOLLFD {
            fd: raw as usize,
            events: windows_sys::Win32::Networking::WinSock::POLLRDNORM,
            revents: 0,
        };
        let timeout_ms = (timeout_us / 1000) as i32;
        let rc = unsafe { WSAPoll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            return -1;
        }
        rc
    }
}
