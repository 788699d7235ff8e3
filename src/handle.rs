use filedesc::FileDesc;
use std::os::raw::{c_int, c_void};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};
use std::time::Duration;

use crate::error::errno;
use crate::{Endpoint, Error, NativeAddress};

/// Delay between attempts of the close retry loop.
const CLOSE_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Owner of one native socket descriptor.
///
/// Every protocol-specific socket embeds a `SocketHandle` and delegates the
/// shared operations (close protocol, local endpoint query, raw fd access)
/// to it. A handle is live while owned; it is destroyed by [`close()`](Self::close),
/// which consumes it, or as a fallback by drop (single native close, errors
/// ignored, no retry protocol).
pub struct SocketHandle {
	fd: FileDesc,
}

/// Access to the shared [`SocketHandle`] of a protocol-specific socket.
pub trait AsHandle {
	/// Borrow the underlying handle.
	fn as_handle(&self) -> &SocketHandle;

	/// Take the underlying handle, discarding protocol-specific state.
	fn into_handle(self) -> SocketHandle;
}

impl SocketHandle {
	/// Create a native socket descriptor with the `close-on-exec` flag set.
	///
	/// The flag is set atomically at creation if the platform supports it.
	///
	/// See `man socket` for more information.
	pub(crate) fn new(family: c_int, kind: c_int, protocol: c_int) -> Result<Self, Error> {
		let fd = match raw_socket(family, kind | libc::SOCK_CLOEXEC, protocol) {
			Ok(fd) => fd,
			// Fall back to setting close-on-exec after creation if SOCK_CLOEXEC is not supported.
			Err(libc::EINVAL) => {
				let fd = raw_socket(family, kind, protocol).map_err(Error::from_os_error)?;
				fd.set_close_on_exec(true).map_err(Error::from_io)?;
				fd
			},
			Err(raw) => return Err(Error::from_os_error(raw)),
		};
		Ok(Self { fd })
	}

	/// Close the socket, waiting out lingering unsent data if needed.
	///
	/// Equivalent to [`close_with_retry_limit(None)`](Self::close_with_retry_limit):
	/// the retry loop has no iteration ceiling.
	pub fn close(self) -> Result<(), CloseError<Self>> {
		self.close_with_retry_limit(None)
	}

	/// Close the socket with an optional ceiling on linger retries.
	///
	/// A non-blocking socket with unsent data under a non-zero linger
	/// timeout can refuse to close with a transient would-block condition.
	/// That is not treated as a failure: the descriptor is forced into
	/// blocking mode (best effort) and the close is retried with a short
	/// sleep between attempts, until it succeeds, fails for another reason,
	/// or `max_retries` attempts have been spent.
	///
	/// A `bad descriptor` failure means the descriptor is already gone at
	/// the OS level, so it is treated as a completed close.
	///
	/// Any other failure returns a [`CloseError`] carrying the still-live
	/// socket; nothing is released and the caller decides whether to call
	/// `close` again or give the socket up to drop.
	pub fn close_with_retry_limit(self, max_retries: Option<usize>) -> Result<(), CloseError<Self>> {
		let fd = self.fd.into_raw_fd();
		let mut forced_blocking = false;
		let mut attempts = 0usize;
		loop {
			if unsafe { libc::close(fd) } == 0 {
				return Ok(());
			}
			let raw = errno();
			if raw == libc::EWOULDBLOCK || raw == libc::EAGAIN {
				// Lingering unsent data on a non-blocking descriptor.
				if !forced_blocking {
					log::trace!("close of fd {} would block, switching to blocking mode", fd);
					// Best effort: there is no better fallback if this fails.
					let _ = set_nonblocking_raw(fd, false);
					forced_blocking = true;
				}
				if let Some(limit) = max_retries {
					if attempts >= limit {
						log::debug!("close of fd {} still blocked after {} retries", fd, attempts);
						return Err(CloseError {
							error: Error::Unknown(raw),
							socket: unsafe { Self::from_raw_fd(fd) },
						});
					}
				}
				attempts += 1;
				std::thread::sleep(CLOSE_RETRY_INTERVAL);
			} else if raw == libc::EBADF {
				// The OS no longer knows the descriptor. Nothing further can
				// be done with it, so the close is complete.
				return Ok(());
			} else {
				log::debug!("close of fd {} failed with os error {}", fd, raw);
				return Err(CloseError {
					error: Error::from_os_error(raw),
					socket: unsafe { Self::from_raw_fd(fd) },
				});
			}
		}
	}

	/// Get the OS-assigned local endpoint of the socket.
	///
	/// See `man getsockname` for more information.
	pub fn local_endpoint(&self) -> Result<Endpoint, Error> {
		let mut address = NativeAddress::new_empty();
		let mut len = NativeAddress::max_len();
		unsafe {
			check_ret(libc::getsockname(self.as_raw_fd(), address.as_sockaddr_mut(), &mut len))
				.map_err(Error::from_os_error)?;
		}
		address.set_len(len);
		address.to_endpoint()
	}

	/// Put the socket in blocking or non-blocking mode.
	pub(crate) fn set_nonblocking(&self, non_blocking: bool) -> Result<(), i32> {
		set_nonblocking_raw(self.as_raw_fd(), non_blocking)
	}

	/// Set a native socket option from a typed value.
	///
	/// See `man setsockopt` for more information.
	pub(crate) fn set_native_option<T: Copy>(&self, level: c_int, option: c_int, value: T) -> Result<(), i32> {
		unsafe {
			let value = &value as *const T as *const c_void;
			let length = std::mem::size_of::<T>() as libc::socklen_t;
			check_ret(libc::setsockopt(self.as_raw_fd(), level, option, value, length))?;
			Ok(())
		}
	}

	/// Get a native socket option as a typed value.
	///
	/// See `man getsockopt` for more information.
	pub(crate) fn get_native_option<T: Copy>(&self, level: c_int, option: c_int) -> Result<T, i32> {
		unsafe {
			let mut output = std::mem::MaybeUninit::<T>::zeroed();
			let output_ptr = output.as_mut_ptr() as *mut c_void;
			let mut length = std::mem::size_of::<T>() as libc::socklen_t;
			check_ret(libc::getsockopt(self.as_raw_fd(), level, option, output_ptr, &mut length))?;
			assert_eq!(length, std::mem::size_of::<T>() as libc::socklen_t);
			Ok(output.assume_init())
		}
	}

	/// Set a native socket option from a raw byte buffer.
	pub(crate) fn set_native_option_raw(&self, level: c_int, option: c_int, value: &[u8]) -> Result<(), i32> {
		unsafe {
			check_ret(libc::setsockopt(
				self.as_raw_fd(),
				level,
				option,
				value.as_ptr() as *const c_void,
				value.len() as libc::socklen_t,
			))?;
			Ok(())
		}
	}

	/// Get a native socket option into a raw byte buffer.
	///
	/// Returns the number of bytes the kernel wrote.
	pub(crate) fn get_native_option_raw(&self, level: c_int, option: c_int, value: &mut [u8]) -> Result<usize, i32> {
		unsafe {
			let mut length = value.len() as libc::socklen_t;
			check_ret(libc::getsockopt(
				self.as_raw_fd(),
				level,
				option,
				value.as_mut_ptr() as *mut c_void,
				&mut length,
			))?;
			Ok(length as usize)
		}
	}

	/// Wrap a raw file descriptor in a [`SocketHandle`].
	///
	/// This function sets no flags or options on the descriptor.
	/// It is your own responsibility to make sure the close-on-exec flag
	/// is already set.
	pub unsafe fn from_raw_fd(fd: RawFd) -> Self {
		Self {
			fd: FileDesc::from_raw_fd(fd),
		}
	}

	/// Get the raw file descriptor.
	///
	/// This function does not release ownership of the underlying descriptor.
	pub fn as_raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}

	/// Release and get the raw file descriptor.
	///
	/// The descriptor will no longer be closed when the handle is dropped.
	pub fn into_raw_fd(self) -> RawFd {
		self.fd.into_raw_fd()
	}
}

impl std::fmt::Debug for SocketHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("SocketHandle").field("fd", &self.as_raw_fd()).finish()
	}
}

impl FromRawFd for SocketHandle {
	unsafe fn from_raw_fd(fd: RawFd) -> Self {
		Self::from_raw_fd(fd)
	}
}

impl AsRawFd for SocketHandle {
	fn as_raw_fd(&self) -> RawFd {
		self.as_raw_fd()
	}
}

impl IntoRawFd for SocketHandle {
	fn into_raw_fd(self) -> RawFd {
		self.into_raw_fd()
	}
}

impl AsHandle for SocketHandle {
	fn as_handle(&self) -> &SocketHandle {
		self
	}

	fn into_handle(self) -> SocketHandle {
		self
	}
}

/// A failed close, carrying the still-live socket.
///
/// Returned for close failures that are neither the transient would-block
/// condition nor `bad descriptor`. The socket has not been released; call
/// `close` on it again to retry, or drop it to fall back to a plain
/// best-effort close.
#[derive(Debug)]
pub struct CloseError<T> {
	error: Error,
	socket: T,
}

impl<T> CloseError<T> {
	/// Get the portable error the close failed with.
	pub fn error(&self) -> Error {
		self.error
	}

	/// Take the still-live socket back out for a retry.
	pub fn into_socket(self) -> T {
		self.socket
	}

	/// Split into the error and the still-live socket.
	pub fn into_parts(self) -> (Error, T) {
		(self.error, self.socket)
	}

	/// Rewrap the carried socket as a richer type.
	pub(crate) fn map_socket<U>(self, wrap: impl FnOnce(T) -> U) -> CloseError<U> {
		CloseError {
			error: self.error,
			socket: wrap(self.socket),
		}
	}
}

impl<T> std::fmt::Display for CloseError<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "failed to close socket: {}", self.error)
	}
}

impl<T: std::fmt::Debug> std::error::Error for CloseError<T> {}

/// Wrap the return value of a libc function, turning `-1` into the errno value.
pub(crate) fn check_ret(ret: c_int) -> Result<c_int, i32> {
	if ret == -1 {
		Err(errno())
	} else {
		Ok(ret)
	}
}

/// Wrap the return value of a libc function, turning `-1` into the errno value.
pub(crate) fn check_ret_isize(ret: isize) -> Result<isize, i32> {
	if ret == -1 {
		Err(errno())
	} else {
		Ok(ret)
	}
}

/// Create a socket descriptor and wrap it.
fn raw_socket(family: c_int, kind: c_int, protocol: c_int) -> Result<FileDesc, i32> {
	unsafe {
		let fd = check_ret(libc::socket(family, kind, protocol))?;
		Ok(FileDesc::from_raw_fd(fd))
	}
}

/// Switch a descriptor between blocking and non-blocking mode.
fn set_nonblocking_raw(fd: RawFd, non_blocking: bool) -> Result<(), i32> {
	unsafe {
		let flags = check_ret(libc::fcntl(fd, libc::F_GETFL))?;
		let flags = if non_blocking {
			flags | libc::O_NONBLOCK
		} else {
			flags & !libc::O_NONBLOCK
		};
		check_ret(libc::fcntl(fd, libc::F_SETFL, flags))?;
		Ok(())
	}
}

pub(crate) fn bool_to_c_int(value: bool) -> c_int {
	if value {
		1
	} else {
		0
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn closing_a_dead_descriptor_is_complete() {
		// A descriptor the OS already released closes to Ok: nothing more
		// can be done with a bad descriptor.
		// Duplicate to a high descriptor number first so no concurrent test
		// can be handed the same number between the close calls.
		let fd = unsafe { check_ret(libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0)).unwrap() };
		let high = unsafe { check_ret(libc::fcntl(fd, libc::F_DUPFD, 600)).unwrap() };
		unsafe {
			assert!(libc::close(fd) == 0);
			assert!(libc::close(high) == 0);
		}
		let handle = unsafe { SocketHandle::from_raw_fd(high) };
		assert!(let Ok(()) = handle.close());
	}

	#[test]
	fn close_with_zero_retry_budget_still_closes_an_idle_socket() {
		let handle = SocketHandle::new(libc::AF_INET, libc::SOCK_DGRAM, 0).unwrap();
		assert!(let Ok(()) = handle.close_with_retry_limit(Some(0)));
	}

	#[test]
	fn failed_close_hands_back_a_usable_socket() {
		// A close failure does not release anything: the caller gets the
		// still-live socket back and a retried close works normally.
		let handle = SocketHandle::new(libc::AF_INET, libc::SOCK_DGRAM, 0).unwrap();
		let failed = CloseError {
			error: Error::Unknown(libc::EIO),
			socket: handle,
		};
		assert!(failed.error() == Error::Unknown(libc::EIO));

		let handle = failed.into_socket();
		assert!(let Ok(()) = handle.close());
	}

	#[test]
	fn close_error_splits_into_error_and_socket() {
		let handle = SocketHandle::new(libc::AF_INET, libc::SOCK_DGRAM, 0).unwrap();
		let failed = CloseError {
			error: Error::Unknown(libc::EINTR),
			socket: handle,
		};

		let (error, handle) = failed.into_parts();
		assert!(error == Error::Unknown(libc::EINTR));
		assert!(let Ok(()) = handle.close());
	}

	#[test]
	fn nonblocking_round_trip() {
		let handle = SocketHandle::new(libc::AF_INET, libc::SOCK_DGRAM, 0).unwrap();
		handle.set_nonblocking(true).unwrap();
		handle.set_nonblocking(false).unwrap();
		handle.close().unwrap();
	}
}
