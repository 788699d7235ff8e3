//! Portable non-blocking UDP/TCP sockets.
//!
//! Operating systems disagree on the small print of their socket APIs:
//! error codes, option names, whether IPv6 sockets can accept IPv4-mapped
//! traffic, and what happens when you close a non-blocking socket that
//! still has unsent data under a linger timeout. This library puts one
//! contract in front of those differences so applications do not need
//! per-OS branches.
//!
//! The sockets are created non-blocking; readiness must be polled
//! externally (the optional `mio` feature registers the socket types with
//! a `mio::Poll`). Every fallible operation returns a portable [`Error`]
//! value, never a panic or a signal, and the transient would-block
//! condition of a non-blocking socket is reported as `Ok(None)` rather
//! than as an error.
//!
//! Closing deserves a mention: [`UdpSocket::close`] consumes the socket
//! and, if the kernel refuses because unsent data is still lingering,
//! switches the descriptor to blocking mode and retries until the data
//! drained or a real failure shows up. A real failure hands the socket
//! back inside the [`CloseError`] so the caller can retry.

mod error;
pub use error::*;

mod endpoint;
pub use endpoint::*;

mod options;
pub use options::*;

mod handle;
pub use handle::*;

mod udp;
pub use udp::*;

mod tcp;
pub use tcp::*;

#[cfg(feature = "mio")]
mod mio;
