use std::os::raw::c_int;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};

use crate::handle::check_ret;
use crate::udp::apply_open_options;
use crate::{
	translate_option, AsHandle, Capabilities, CloseError, Endpoint, Error, Family, OpenFlags,
	Protocol, SocketHandle, SocketOption,
};

/// Settings applied to a TCP socket while it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSettings {
	/// Send buffer size in bytes. Must fit a native `int`.
	pub send_buffer_size: usize,

	/// Receive buffer size in bytes. Must fit a native `int`.
	pub recv_buffer_size: usize,

	/// Pending-connection queue depth used once `listen` is implemented.
	pub backlog: u16,
}

impl TcpSettings {
	/// The default settings: 8 KiB buffers, backlog 64.
	pub const DEFAULT: Self = Self {
		send_buffer_size: 8192,
		recv_buffer_size: 8192,
		backlog: 64,
	};
}

impl Default for TcpSettings {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// A non-blocking TCP socket bound to a local endpoint.
///
/// `listen` and `connect` are unimplemented on the current platform
/// variants and fail with [`Error::NotImplemented`] after validating their
/// arguments. The close protocol and the local endpoint query are shared
/// with UDP through the common handle.
#[derive(Debug)]
pub struct TcpSocket {
	handle: SocketHandle,
	family: Family,
	backlog: c_int,
}

impl TcpSocket {
	/// Open a TCP socket bound to `local`.
	///
	/// Same fail-fast shape as the UDP open: any failure after descriptor
	/// creation closes the descriptor before returning.
	pub fn open(local: &Endpoint, settings: &TcpSettings, flags: OpenFlags) -> Result<Self, Error> {
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

		let dual_stack = flags.contains(OpenFlags::DUAL_STACK);
		if dual_stack && (local.family() != Family::Inet6 || !caps.dual_stack) {
			return Err(Error::InvalidArgument);
		}
		let native_family = match local.family() {
			Family::Inet4 => libc::AF_INET,
			Family::Inet6 => libc::AF_INET6,
			Family::Unspecified => return Err(Error::InvalidArgument),
		};

		let handle = SocketHandle::new(native_family, libc::SOCK_STREAM, 0)?;
		apply_open_options(&handle, settings.send_buffer_size, settings.recv_buffer_size, flags, &caps)
			.and_then(|()| {
				if local.family() == Family::Inet6 {
					handle.set_native_option(
						libc::IPPROTO_IPV6,
						libc::IPV6_V6ONLY,
						crate::handle::bool_to_c_int(!dual_stack),
					)
				} else {
					Ok(())
				}
			})
			.and_then(|()| handle.set_nonblocking(true))
			.and_then(|()| unsafe {
				check_ret(libc::bind(handle.as_raw_fd(), address.as_sockaddr(), address.len())).map(|_| ())
			})
			.map_err(|raw| {
				log::debug!("tcp open failed with os error {}, discarding descriptor", raw);
				Error::from_os_error(raw)
			})?;

		Ok(Self {
			handle,
			family: local.family(),
			backlog: c_int::from(settings.backlog),
		})
	}

	/// Put the socket in listening mode.
	///
	/// Unimplemented on the current platform variants. The stub validates
	/// first and then fails with [`Error::NotImplemented`], so a real
	/// implementation slots in without call-site changes.
	pub fn listen(&self) -> Result<(), Error> {
		Err(Error::NotImplemented)
	}

	/// Connect the socket to a remote peer.
	///
	/// Unimplemented on the current platform variants. The stub validates
	/// the peer endpoint first and then fails with
	/// [`Error::NotImplemented`].
	pub fn connect(&self, peer: &Endpoint) -> Result<(), Error> {
		if peer.family() != self.family {
			return Err(Error::InvalidArgument);
		}
		peer.to_native()?;
		Err(Error::NotImplemented)
	}

	/// Set a portable socket option.
	///
	/// No option has a translation row yet, so this currently always
	/// fails with [`Error::NotImplemented`].
	pub fn set_option(&self, option: SocketOption, value: &[u8]) -> Result<(), Error> {
		let (level, name) = translate_option(self.family, Protocol::Tcp, option)?;
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
		let (level, name) = translate_option(self.family, Protocol::Tcp, option)?;
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
		let backlog = self.backlog;
		self.handle
			.close()
			.map_err(|err| err.map_socket(|handle| Self { handle, family, backlog }))
	}

	/// Close the socket with a ceiling on linger retries.
	pub fn close_with_retry_limit(self, max_retries: Option<usize>) -> Result<(), CloseError<Self>> {
		let family = self.family;
		let backlog = self.backlog;
		self.handle
			.close_with_retry_limit(max_retries)
			.map_err(|err| err.map_socket(|handle| Self { handle, family, backlog }))
	}
}

impl AsHandle for TcpSocket {
	fn as_handle(&self) -> &SocketHandle {
		&self.handle
	}

	fn into_handle(self) -> SocketHandle {
		self.handle
	}
}

impl AsRawFd for TcpSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.handle.as_raw_fd()
	}
}

impl IntoRawFd for TcpSocket {
	fn into_raw_fd(self) -> RawFd {
		self.handle.into_raw_fd()
	}
}
