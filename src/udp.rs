use std::os::raw::{c_int, c_void};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};

use crate::handle::{bool_to_c_int, check_ret, check_ret_isize};
use crate::{
	translate_option, AsHandle, Capabilities, CloseError, Endpoint, Error, Family, NativeAddress,
	OpenFlags, Protocol, SocketHandle, SocketOption,
};

#[cfg(not(any(target_vendor = "apple", target_os = "solaris", target_os = "illumos")))]
mod extra_flags {
	pub const SEND: std::os::raw::c_int = libc::MSG_NOSIGNAL;
}

#[cfg(any(target_vendor = "apple", target_os = "solaris", target_os = "illumos"))]
mod extra_flags {
	pub const SEND: std::os::raw::c_int = 0;
}

/// Settings applied to a UDP socket while it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpSettings {
	/// Send buffer size in bytes. Must fit a native `int`.
	pub send_buffer_size: usize,

	/// Receive buffer size in bytes. Must fit a native `int`.
	pub recv_buffer_size: usize,

	/// Time-to-live (IPv4) or unicast hop limit (IPv6) of sent datagrams.
	pub ttl: u8,
}

impl UdpSettings {
	/// The default settings: 8 KiB buffers, TTL 64.
	pub const DEFAULT: Self = Self {
		send_buffer_size: 8192,
		recv_buffer_size: 8192,
		ttl: 64,
	};
}

impl Default for UdpSettings {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// A non-blocking UDP socket bound to a local endpoint.
#[derive(Debug)]
pub struct UdpSocket {
	handle: SocketHandle,
	family: Family,
}

impl UdpSocket {
	/// Open a UDP socket bound to `local`.
	///
	/// Validates arguments, creates the native descriptor, applies the
	/// settings and flags, switches to non-blocking mode and binds, in that
	/// order. Any failure after descriptor creation closes the descriptor
	/// before returning, so no descriptor outlives a failed open.
	pub fn open(local: &Endpoint, settings: &UdpSettings, flags: OpenFlags) -> Result<Self, Error> {
		let caps = Capabilities::detect();
		if local.family() == Family::Inet6 && !caps.ipv6 {
			return Err(Error::AddressNotAvailable);
		}
		if settings.send_buffer_size > c_int::MAX as usize
			|| settings.recv_buffer_size > c_int::MAX as usize
		{
			return Err(Error::InvalidArgument);
		}

		let address = local.to_native()?;

		// Dual stack only makes sense on an IPv6 socket, and only when the
		// platform lets us clear v6-only mode.
		let dual_stack = flags.contains(OpenFlags::DUAL_STACK);
		if dual_stack && (local.family() != Family::Inet6 || !caps.dual_stack) {
			return Err(Error::InvalidArgument);
		}
		let native_family = match local.family() {
			Family::Inet4 => libc::AF_INET,
			Family::Inet6 => libc::AF_INET6,
			Family::Unspecified => return Err(Error::InvalidArgument),
		};

		let handle = SocketHandle::new(native_family, libc::SOCK_DGRAM, 0)?;
		apply_open_options(&handle, settings.send_buffer_size, settings.recv_buffer_size, flags, &caps)
			.and_then(|()| {
				if native_family == libc::AF_INET {
					handle.set_native_option(libc::IPPROTO_IP, libc::IP_TTL, c_int::from(settings.ttl))
				} else {
					handle.set_native_option(
						libc::IPPROTO_IPV6,
						libc::IPV6_UNICAST_HOPS,
						c_int::from(settings.ttl),
					)?;
					handle.set_native_option(
						libc::IPPROTO_IPV6,
						libc::IPV6_V6ONLY,
						bool_to_c_int(!dual_stack),
					)
				}
			})
			.and_then(|()| handle.set_nonblocking(true))
			.and_then(|()| unsafe {
				check_ret(libc::bind(handle.as_raw_fd(), address.as_sockaddr(), address.len())).map(|_| ())
			})
			.map_err(|raw| {
				// `handle` is dropped on this path, closing the descriptor.
				log::debug!("udp open failed with os error {}, discarding descriptor", raw);
				Error::from_os_error(raw)
			})?;

		Ok(Self {
			handle,
			family: local.family(),
		})
	}

	/// Send a datagram to `peer`.
	///
	/// Returns `Ok(None)` if the socket is not ready to send yet; poll for
	/// writability and try again.
	///
	/// See `man sendto` for more information.
	pub fn send_to(&self, data: &[u8], peer: &Endpoint) -> Result<Option<usize>, Error> {
		let address = peer.to_native()?;
		let ret = unsafe {
			libc::sendto(
				self.handle.as_raw_fd(),
				data.as_ptr() as *const c_void,
				data.len(),
				extra_flags::SEND,
				address.as_sockaddr(),
				address.len(),
			)
		};
		match check_ret_isize(ret) {
			Ok(transferred) => Ok(Some(transferred as usize)),
			Err(raw) if raw == libc::EWOULDBLOCK || raw == libc::EAGAIN => Ok(None),
			Err(raw) => Err(Error::from_os_error(raw)),
		}
	}

	/// Receive a datagram, reporting the sender's endpoint.
	///
	/// Returns `Ok(None)` if no datagram is available yet; poll for
	/// readability and try again.
	///
	/// See `man recvfrom` for more information.
	pub fn recv_from(&self, buffer: &mut [u8]) -> Result<Option<(usize, Endpoint)>, Error> {
		let mut address = NativeAddress::new_empty();
		let mut address_len = NativeAddress::max_len();
		let ret = unsafe {
			libc::recvfrom(
				self.handle.as_raw_fd(),
				buffer.as_mut_ptr() as *mut c_void,
				buffer.len(),
				0,
				address.as_sockaddr_mut(),
				&mut address_len,
			)
		};
		match check_ret_isize(ret) {
			Ok(transferred) => {
				address.set_len(address_len);
				Ok(Some((transferred as usize, address.to_endpoint()?)))
			},
			Err(raw) if raw == libc::EWOULDBLOCK || raw == libc::EAGAIN => Ok(None),
			Err(raw) => Err(Error::from_os_error(raw)),
		}
	}

	/// Set a portable socket option.
	///
	/// No option has a translation row yet, so this currently always
	/// fails with [`Error::NotImplemented`].
	pub fn set_option(&self, option: SocketOption, value: &[u8]) -> Result<(), Error> {
		let (level, name) = translate_option(self.family, Protocol::Udp, option)?;
		self.handle
			.set_native_option_raw(level, name, value)
			.map_err(Error::from_os_error)
	}

	/// Get a portable socket option.
	///
	/// Returns the number of bytes written into `value`. No option has a
	/// translation row yet, so this currently always fails with
	/// [`Error::NotImplemented`].
	pub fn get_option(&self, option: SocketOption, value: &mut [u8]) -> Result<usize, Error> {
		let (level, name) = translate_option(self.family, Protocol::Udp, option)?;
		self.handle
			.get_native_option_raw(level, name, value)
			.map_err(Error::from_os_error)
	}

	/// Get the OS-assigned local endpoint of the socket.
	pub fn local_endpoint(&self) -> Result<Endpoint, Error> {
		self.handle.local_endpoint()
	}

	/// Close the socket, waiting out lingering unsent data if needed.
	///
	/// On failure the socket comes back inside the [`CloseError`] for a
	/// retried close.
	pub fn close(self) -> Result<(), CloseError<Self>> {
		let family = self.family;
		self.handle
			.close()
			.map_err(|err| err.map_socket(|handle| Self { handle, family }))
	}

	/// Close the socket with a ceiling on linger retries.
	pub fn close_with_retry_limit(self, max_retries: Option<usize>) -> Result<(), CloseError<Self>> {
		let family = self.family;
		self.handle
			.close_with_retry_limit(max_retries)
			.map_err(|err| err.map_socket(|handle| Self { handle, family }))
	}
}

/// Apply the options shared by the UDP and TCP open sequences.
///
/// Ordering matters for observable failure behavior: reuse flags first,
/// then the buffer sizes.
pub(crate) fn apply_open_options(
	handle: &SocketHandle,
	send_buffer_size: usize,
	recv_buffer_size: usize,
	flags: OpenFlags,
	caps: &Capabilities,
) -> Result<(), i32> {
	if flags.contains(OpenFlags::REUSE_ADDRESS) {
		handle.set_native_option(libc::SOL_SOCKET, libc::SO_REUSEADDR, bool_to_c_int(true))?;
		if caps.reuse_port {
			handle.set_native_option(libc::SOL_SOCKET, libc::SO_REUSEPORT, bool_to_c_int(true))?;
		}
	}
	handle.set_native_option(libc::SOL_SOCKET, libc::SO_SNDBUF, send_buffer_size as c_int)?;
	handle.set_native_option(libc::SOL_SOCKET, libc::SO_RCVBUF, recv_buffer_size as c_int)?;
	Ok(())
}

impl AsHandle for UdpSocket {
	fn as_handle(&self) -> &SocketHandle {
		&self.handle
	}

	fn into_handle(self) -> SocketHandle {
		self.handle
	}
}

impl AsRawFd for UdpSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.handle.as_raw_fd()
	}
}

impl IntoRawFd for UdpSocket {
	fn into_raw_fd(self) -> RawFd {
		self.handle.into_raw_fd()
	}
}
