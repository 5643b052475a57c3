//! The closed error taxonomy every fallible entry point in this crate returns.
//!
//! Variants carry the OS-reported numeric code and message where one is
//! available, so callers can log or match on the underlying `errno`/
//! `WSAGetLastError` value without losing the high-level classification.

/// A single failure category reported by this crate.
///
/// This is a closed set by design: the library never returns a raw
/// `std::io::Error` across its public API, so that callers can exhaustively
/// match on failure kind instead of parsing OS-specific error strings.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Descriptor creation, subsystem init, or option-set failed.
    #[error("socket setup failed: {message} (os error {code})")]
    Setup { code: i32, message: String },

    /// Hostname lookup failed, or resolution returned zero candidates.
    #[error("address resolution failed: {message} (os error {code})")]
    Resolve { code: i32, message: String },

    /// The address was in use or otherwise unbindable.
    #[error("bind failed: {message} (os error {code})")]
    Bind { code: i32, message: String },

    /// No listening peer, connection refused, or host unreachable.
    #[error("connect failed: {message} (os error {code})")]
    Connect { code: i32, message: String },

    /// The listening descriptor was no longer valid at accept time.
    #[error("accept failed: {message} (os error {code})")]
    Accept { code: i32, message: String },

    /// A readiness wait elapsed without the expected event.
    #[error("operation timed out")]
    Timeout,

    /// Illegal input rejected before any syscall was attempted.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The operation was attempted on a descriptor that is already closed.
    #[error("operation attempted on a closed socket")]
    Closed,
}

impl Error {
    /// Build a [`Error::Setup`] from the current thread's last OS socket error.
    pub(crate) fn setup_from_os(context: &str) -> Self {
        let (code, message) = crate::compat::last_error();
        Error::Setup {
            code,
            message: format!("{context}: {message}"),
        }
    }

    /// Build a [`Error::Bind`] from the current thread's last OS socket error.
    pub(crate) fn bind_from_os(context: &str) -> Self {
        let (code, message) = crate::compat::last_error();
        Error::Bind {
            code,
            message: format!("{context}: {message}"),
        }
    }

    /// Build a [`Error::Connect`] from the current thread's last OS socket error.
    pub(crate) fn connect_from_os(context: &str) -> Self {
        let (code, message) = crate::compat::last_error();
        Error::Connect {
            code,
            message: format!("{context}: {message}"),
        }
    }

    /// Build a [`Error::Accept`] from the current thread's last OS socket error.
    pub(crate) fn accept_from_os(context: &str) -> Self {
        let (code, message) = crate::compat::last_error();
        Error::Accept {
            code,
            message: format!("{context}: {message}"),
        }
    }

    /// Build a [`Error::Resolve`] from an `io::Error` returned by a resolver call.
    pub(crate) fn resolve_from_io(err: &std::io::Error) -> Self {
        Error::Resolve {
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Wire-level `io::Error`s that escape a syscall wrapper are reported as
    /// setup failures; specific call sites prefer the more precise
    /// `*_from_os`/`*_from_io` constructors above.
    fn from(err: std::io::Error) -> Self {
        Error::Setup {
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

/// Convenience alias used throughout this crate's public API.
pub type Result<T> = std::result::Result<T, Error>;
