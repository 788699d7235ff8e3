use std::os::raw::c_int;

use crate::{Error, Family};

/// Transport protocol of a socket, used to select option translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
	Udp,
	Tcp,
}

/// Portable socket option identifier.
///
/// The per-socket `set_option`/`get_option` entry points route through
/// [`translate_option`]; an option becomes usable by adding its
/// translation row there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SocketOption {
	SendBufferSize,
	RecvBufferSize,
	UnicastHopLimit,
}

/// Translate a portable option to a native `(level, name)` pair.
///
/// The translation table. No rows are populated yet, so every lookup
/// currently answers [`Error::NotImplemented`]; the entry points stay
/// wired through here so that supporting an option is one new arm, not a
/// new code path.
pub fn translate_option(
	family: Family,
	protocol: Protocol,
	option: SocketOption,
) -> Result<(c_int, c_int), Error> {
	let _ = (family, protocol);
	match option {
		SocketOption::SendBufferSize
		| SocketOption::RecvBufferSize
		| SocketOption::UnicastHopLimit => Err(Error::NotImplemented),
	}
}

bitflags::bitflags! {
	/// Behavioral switches accepted by `open`.
	///
	/// Translated to native options at open time, never stored in the socket.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct OpenFlags: u32 {
		/// Ask for an IPv6 socket that also accepts IPv4-mapped traffic.
		///
		/// Only honored for IPv6 local endpoints on builds where
		/// [`Capabilities::dual_stack`] is set; requesting it anywhere else
		/// fails `open` with [`Error::InvalidArgument`].
		const DUAL_STACK = 1 << 0;

		/// Allow rebinding a recently used local address and port.
		const REUSE_ADDRESS = 1 << 1;
	}
}

/// Platform feature report consulted by `open`.
///
/// Centralizes the build/platform branching so the open sequences query one
/// place instead of scattering conditional compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	/// IPv6 sockets can be created.
	pub ipv6: bool,

	/// IPv6 sockets can be switched out of v6-only mode.
	pub dual_stack: bool,

	/// `SO_REUSEPORT` is available in addition to `SO_REUSEADDR`.
	pub reuse_port: bool,
}

impl Capabilities {
	/// Report the features of the current build and platform.
	pub const fn detect() -> Self {
		Self {
			ipv6: true,
			dual_stack: cfg!(any(
				target_os = "linux",
				target_os = "android",
				target_os = "freebsd",
				target_os = "openbsd",
				target_os = "netbsd",
				target_vendor = "apple",
			)),
			reuse_port: cfg!(any(
				target_os = "linux",
				target_os = "android",
				target_os = "freebsd",
				target_os = "openbsd",
				target_os = "netbsd",
				target_vendor = "apple",
			)),
		}
	}
}
