use thiserror::Error;

/// Portable error code returned by every fallible operation.
///
/// "No error" is expressed as [`Ok`], never as an enum member.
/// Native codes without a dedicated variant land in [`Error::Unknown`]
/// with the raw errno value preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
	/// An argument was null, contradictory or out of range.
	#[error("invalid argument")]
	InvalidArgument,

	/// The kernel could not allocate memory or buffer space.
	#[error("out of memory")]
	OutOfMemory,

	/// The requested feature is unavailable on this build or platform.
	#[error("not supported on this platform")]
	NotSupported,

	/// The operation is intentionally not implemented yet.
	#[error("not implemented")]
	NotImplemented,

	/// The address family or address is unusable here.
	#[error("address not available")]
	AddressNotAvailable,

	/// An unmapped native error code.
	#[error("unmapped OS error {0}")]
	Unknown(i32),
}

impl Error {
	/// Map a native error code to a portable error.
	///
	/// Must not be called with a control condition: `EWOULDBLOCK`/`EAGAIN`,
	/// `EINPROGRESS` and `EOPNOTSUPP` mean "not ready yet" or "handled at
	/// the socket-semantics level" and have to be intercepted by the caller
	/// before mapping. Reaching this function with one is a caller bug.
	pub fn from_os_error(raw: i32) -> Self {
		debug_assert!(raw != 0, "from_os_error called without a failure");
		debug_assert!(
			raw != libc::EWOULDBLOCK
				&& raw != libc::EAGAIN
				&& raw != libc::EINPROGRESS
				&& raw != libc::EOPNOTSUPP,
			"control condition {} reached the error mapper",
			raw,
		);
		match raw {
			libc::EINVAL | libc::EFAULT | libc::EDOM => Self::InvalidArgument,
			libc::ENOMEM | libc::ENOBUFS => Self::OutOfMemory,
			libc::EAFNOSUPPORT | libc::EPROTONOSUPPORT => Self::NotSupported,
			libc::EADDRNOTAVAIL | libc::EADDRINUSE => Self::AddressNotAvailable,
			other => Self::Unknown(other),
		}
	}

	/// Map an [`std::io::Error`] carrying a raw OS code.
	pub(crate) fn from_io(err: std::io::Error) -> Self {
		match err.raw_os_error() {
			Some(raw) => Self::from_os_error(raw),
			None => Self::Unknown(0),
		}
	}
}

/// Get the calling thread's current errno value.
pub(crate) fn errno() -> i32 {
	std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn maps_known_codes() {
		assert!(Error::from_os_error(libc::EINVAL) == Error::InvalidArgument);
		assert!(Error::from_os_error(libc::EFAULT) == Error::InvalidArgument);
		assert!(Error::from_os_error(libc::ENOMEM) == Error::OutOfMemory);
		assert!(Error::from_os_error(libc::ENOBUFS) == Error::OutOfMemory);
		assert!(Error::from_os_error(libc::EAFNOSUPPORT) == Error::NotSupported);
		assert!(Error::from_os_error(libc::EADDRNOTAVAIL) == Error::AddressNotAvailable);
		assert!(Error::from_os_error(libc::EADDRINUSE) == Error::AddressNotAvailable);
	}

	#[test]
	fn unmapped_codes_keep_the_raw_value() {
		assert!(Error::from_os_error(libc::EIO) == Error::Unknown(libc::EIO));
		assert!(Error::from_os_error(libc::EINTR) == Error::Unknown(libc::EINTR));
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "control condition")]
	fn would_block_is_a_caller_bug() {
		let _ = Error::from_os_error(libc::EWOULDBLOCK);
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "control condition")]
	fn in_progress_is_a_caller_bug() {
		let _ = Error::from_os_error(libc::EINPROGRESS);
	}
}
