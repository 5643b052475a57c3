//! Commonly used types, re-exported for `use socketcore::prelude::*;`.

pub use crate::address::{resolve, Address, InternetProtocolVersion, ResolveHints, SocketKind};
pub use crate::error::{Error, Result};
pub use crate::server::TcpServerSocket;
pub use crate::tcp::TcpSocket;
pub use crate::udp::{SocketHook, UdpSocket};
