//! Address values and hostname resolution.
//!
//! A tagged IPv4/IPv6 address is represented directly as
//! [`std::net::SocketAddr`] — already a `V4(SocketAddrV4)` /
//! `V6(SocketAddrV6)` enum with the port stored the way the OS expects it,
//! so there is no need to hand-roll a `#[repr(C)]` union over
//! `sockaddr_in`/`sockaddr_in6`. This module re-exports it as [`Address`]
//! and supplies resolution and introspection helpers around it.

use crate::error::Error;
use socket2::{Domain, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, ToSocketAddrs};

/// A concrete IPv4 or IPv6 endpoint.
///
/// This is a re-export of [`std::net::SocketAddr`]: there is no
/// "unspecified family, not yet resolved" state in this type, so every
/// constructor in this crate represents "not yet resolved" as
/// `Option<Address>` rather than a default-constructed sentinel value.
pub type Address = SocketAddr;

/// Caller-facing hint describing which IP family a resolution or bind
/// should prefer.
///
/// `Any` is a hint only — it is never the *stored* state of a socket once
/// a concrete address has been chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternetProtocolVersion {
    /// No family preference; accept the first resolvable candidate.
    Any,
    /// Prefer/require IPv4.
    V4,
    /// Prefer/require IPv6.
    V6,
}

impl InternetProtocolVersion {
    /// The concrete version implied by an already-resolved address.
    pub fn of(addr: &Address) -> Self {
        match addr {
            SocketAddr::V4(_) => InternetProtocolVersion::V4,
            SocketAddr::V6(_) => InternetProtocolVersion::V6,
        }
    }

    fn matches(self, addr: &Address) -> bool {
        match self {
            InternetProtocolVersion::Any => true,
            InternetProtocolVersion::V4 => matches!(addr, SocketAddr::V4(_)),
            InternetProtocolVersion::V6 => matches!(addr, SocketAddr::V6(_)),
        }
    }
}

/// The socket kind a resolution is being performed for — stream (TCP) or
/// datagram (UDP) — used to build the right `hints` template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Stream,
    Datagram,
}

/// A resolution hints template: family preference, socket kind, and
/// whether this is a *passive* (listening/binding) resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveHints {
    pub version: InternetProtocolVersion,
    pub kind: SocketKind,
    pub passive: bool,
}

impl ResolveHints {
    /// Hints template for an outbound/inbound TCP stream socket.
    pub fn tcp(version: InternetProtocolVersion, passive: bool) -> Self {
        Self {
            version,
            kind: SocketKind::Stream,
            passive,
        }
    }

    /// Hints template for a UDP datagram socket.
    pub fn udp(version: InternetProtocolVersion, passive: bool) -> Self {
        Self {
            version,
            kind: SocketKind::Datagram,
            passive,
        }
    }
}

/// Resolves `(hostname?, port, hints)` to an ordered list of candidate
/// addresses.
///
/// If `hostname` is absent and `hints.passive` is set, resolution yields a
/// wildcard local address (`0.0.0.0` or `::`, chosen by `hints.version`;
/// `Any` yields both, IPv4 first). An empty result is *not* an error here —
/// callers treat an empty list as a `Resolve`/`Bind` failure at the point
/// of use.
pub fn resolve(hostname: Option<&str>, port: u16, hints: &ResolveHints) -> Result<Vec<Address>, Error> {
    let candidates: Vec<Address> = match hostname {
        Some(host) => {
            let lookup = format!("{host}:{port}");
            lookup
                .to_socket_addrs()
                .map_err(|e| Error::resolve_from_io(&e))?
                .filter(|addr| hints.version.matches(addr))
                .collect()
        }
        None if hints.passive => wildcard_addresses(port, hints.version),
        None => Vec::new(),
    };
    Ok(order_candidates(candidates, hints.version))
}

fn wildcard_addresses(port: u16, version: InternetProtocolVersion) -> Vec<Address> {
    let v4 = Address::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    let v6 = Address::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0));
    match version {
        InternetProtocolVersion::V4 => vec![v4],
        InternetProtocolVersion::V6 => vec![v6],
        InternetProtocolVersion::Any => vec![v4, v6],
    }
}

/// Resolution order is IPv4-before-IPv6 for `Any` lookups, matching the
/// order most OS resolvers return for dual-stack hosts.
fn order_candidates(mut candidates: Vec<Address>, _version: InternetProtocolVersion) -> Vec<Address> {
    candidates.sort_by_key(|addr| match addr {
        SocketAddr::V4(_) => 0u8,
        SocketAddr::V6(_) => 1u8,
    });
    candidates
}

/// Extracts the port from an address, consistent with the address
/// family's tag.
pub fn port_of(addr: &Address) -> u16 {
    addr.port()
}

/// Returns the printable numeric-host form of an address (no port).
pub fn printable(addr: &Address) -> String {
    match addr {
        SocketAddr::V4(v4) => v4.ip().to_string(),
        SocketAddr::V6(v6) => v6.ip().to_string(),
    }
}

/// The wire size of the `sockaddr_in`/`sockaddr_in6` structure a given
/// address family occupies on the wire.
///
/// Not needed by any syscall in this implementation (`socket2` and
/// `std::net` already track this internally), but kept as a standalone
/// helper for callers used to looking it up explicitly.
pub fn address_length(addr: &Address) -> usize {
    #[cfg(unix)]
    {
        match addr {
            SocketAddr::V4(_) => std::mem::size_of::<libc::sockaddr_in>(),
            SocketAddr::V6(_) => std::mem::size_of::<libc::sockaddr_in6>(),
        }
    }
    #[cfg(windows)]
    {
        use windows_sys::Win32::Networking::WinSock::{SOCKADDR_IN, SOCKADDR_IN6};
        match addr {
            SocketAddr::V4(_) => std::mem::size_of::<SOCKADDR_IN>(),
            SocketAddr::V6(_) => std::mem::size_of::<SOCKADDR_IN6>(),
        }
    }
}

/// Reads the locally bound address of a descriptor, used after binding to
/// port `0` to discover the ephemeral port the OS assigned.
pub fn local_address_of(socket: &Socket) -> Result<Address, Error> {
    socket
        .local_addr()
        .map_err(Error::from)
        .and_then(|sock_addr| {
            sock_addr
                .as_socket()
                .ok_or_else(|| Error::Setup {
                    code: -1,
                    message: "local address was not an IPv4/IPv6 socket address".to_string(),
                })
        })
}

/// Creates a new `socket2::Socket` of the given kind for the given
/// concrete (non-`Any`) address family.
pub(crate) fn new_socket(addr: &Address, kind: SocketKind) -> Result<Socket, Error> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let ty = match kind {
        SocketKind::Stream => Type::STREAM,
        SocketKind::Datagram => Type::DGRAM,
    };
    Socket::new(domain, ty, None).map_err(|_| Error::setup_from_os("socket"))
}
