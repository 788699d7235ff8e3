use crate::{Capabilities, Error};

/// Address family of an [`Endpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
	/// No family chosen yet. Not convertible to a native address.
	Unspecified,

	/// IPv4.
	Inet4,

	/// IPv6.
	Inet6,
}

/// Portable network endpoint: family, address bytes, port and IPv6 scope.
///
/// Pure value type. Round-trips losslessly through the native socket
/// address representation for the supported families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
	family: Family,
	address: [u8; 16],
	port: u16,
	scope_id: u32,
}

impl Endpoint {
	/// Create an IPv4 endpoint from an address and a port number.
	pub fn inet4(ip: [u8; 4], port: u16) -> Self {
		let mut address = [0u8; 16];
		address[..4].copy_from_slice(&ip);
		Self {
			family: Family::Inet4,
			address,
			port,
			scope_id: 0,
		}
	}

	/// Create an IPv6 endpoint from an address, a port number and a scope id.
	pub fn inet6(ip: [u8; 16], port: u16, scope_id: u32) -> Self {
		Self {
			family: Family::Inet6,
			address: ip,
			port,
			scope_id,
		}
	}

	/// Create an endpoint without a chosen family.
	pub fn unspecified() -> Self {
		Self {
			family: Family::Unspecified,
			address: [0u8; 16],
			port: 0,
			scope_id: 0,
		}
	}

	/// Get the address family.
	pub fn family(&self) -> Family {
		self.family
	}

	/// Get the raw address bytes.
	///
	/// Only the first 4 bytes are meaningful for IPv4 endpoints.
	pub fn address(&self) -> &[u8; 16] {
		&self.address
	}

	/// Get the port number in host byte order.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Get the IPv6 scope id. Always `0` for other families.
	pub fn scope_id(&self) -> u32 {
		self.scope_id
	}

	/// Convert the endpoint to a native socket address.
	///
	/// Fails with [`Error::AddressNotAvailable`] for the unspecified family
	/// and for IPv6 endpoints when the platform lacks IPv6 support.
	pub fn to_native(&self) -> Result<NativeAddress, Error> {
		match self.family {
			Family::Inet4 => {
				let mut output = NativeAddress::new_empty();
				unsafe {
					let inner = &mut *(output.as_sockaddr_mut() as *mut libc::sockaddr_in);
					inner.sin_family = libc::AF_INET as libc::sa_family_t;
					inner.sin_port = self.port.to_be();
					let mut ip = [0u8; 4];
					ip.copy_from_slice(&self.address[..4]);
					inner.sin_addr.s_addr = u32::from_ne_bytes(ip);
				}
				output.set_len(std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t);
				Ok(output)
			},
			Family::Inet6 => {
				if !Capabilities::detect().ipv6 {
					return Err(Error::AddressNotAvailable);
				}
				let mut output = NativeAddress::new_empty();
				unsafe {
					let inner = &mut *(output.as_sockaddr_mut() as *mut libc::sockaddr_in6);
					inner.sin6_family = libc::AF_INET6 as libc::sa_family_t;
					inner.sin6_port = self.port.to_be();
					inner.sin6_addr.s6_addr = self.address;
					inner.sin6_scope_id = self.scope_id;
				}
				output.set_len(std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t);
				Ok(output)
			},
			Family::Unspecified => Err(Error::AddressNotAvailable),
		}
	}
}

/// Native socket address, large enough to hold any address the kernel produces.
#[derive(Clone)]
#[repr(C)]
pub struct NativeAddress {
	/// The inner C-compatible socket address.
	inner: libc::sockaddr_storage,

	/// The length of the socket address.
	len: libc::socklen_t,
}

impl NativeAddress {
	/// Construct a zeroed address suitable for the kernel to write into.
	///
	/// After the kernel wrote an address to [`as_sockaddr_mut()`](Self::as_sockaddr_mut),
	/// record the actual length with [`set_len()`](Self::set_len).
	pub fn new_empty() -> Self {
		unsafe { std::mem::zeroed() }
	}

	/// Get a pointer to the socket address.
	pub fn as_sockaddr(&self) -> *const libc::sockaddr {
		&self.inner as *const _ as *const _
	}

	/// Get a mutable pointer to the socket address.
	pub fn as_sockaddr_mut(&mut self) -> *mut libc::sockaddr {
		&mut self.inner as *mut _ as *mut _
	}

	/// Get the length of the socket address, including the family field.
	pub fn len(&self) -> libc::socklen_t {
		self.len
	}

	/// Update the length of the address after the kernel wrote into it.
	///
	/// # Panic
	/// Panics if the length exceeds the storage size.
	pub fn set_len(&mut self, len: libc::socklen_t) {
		assert!(len <= Self::max_len(), "socket address length out of bounds");
		self.len = len;
	}

	/// Get the maximum size the kernel may write through [`as_sockaddr_mut()`](Self::as_sockaddr_mut).
	pub fn max_len() -> libc::socklen_t {
		std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t
	}

	/// Get the native address family.
	pub fn family(&self) -> libc::c_int {
		self.inner.ss_family as libc::c_int
	}

	/// Convert the native address back to a portable endpoint.
	///
	/// Fails with [`Error::AddressNotAvailable`] for families outside the
	/// portable contract.
	pub fn to_endpoint(&self) -> Result<Endpoint, Error> {
		match self.family() {
			libc::AF_INET => {
				let inner: &libc::sockaddr_in = unsafe { &*(self.as_sockaddr() as *const libc::sockaddr_in) };
				Ok(Endpoint::inet4(
					inner.sin_addr.s_addr.to_ne_bytes(),
					u16::from_be(inner.sin_port),
				))
			},
			libc::AF_INET6 => {
				let inner: &libc::sockaddr_in6 = unsafe { &*(self.as_sockaddr() as *const libc::sockaddr_in6) };
				Ok(Endpoint::inet6(
					inner.sin6_addr.s6_addr,
					u16::from_be(inner.sin6_port),
					inner.sin6_scope_id,
				))
			},
			_ => Err(Error::AddressNotAvailable),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn inet4_round_trip() {
		let endpoint = Endpoint::inet4([127, 0, 0, 1], 8080);
		let native = endpoint.to_native().unwrap();
		assert!(native.family() == libc::AF_INET);
		assert!(native.len() == std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t);
		assert!(native.to_endpoint().unwrap() == endpoint);
	}

	#[test]
	fn inet6_round_trip_keeps_scope() {
		let ip = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
		let endpoint = Endpoint::inet6(ip, 5000, 3);
		let native = endpoint.to_native().unwrap();
		assert!(native.family() == libc::AF_INET6);
		let back = native.to_endpoint().unwrap();
		assert!(back == endpoint);
		assert!(back.scope_id() == 3);
	}

	#[test]
	fn unspecified_family_has_no_native_form() {
		assert!(let Err(Error::AddressNotAvailable) = Endpoint::unspecified().to_native());
	}

	#[test]
	fn unknown_native_family_is_rejected() {
		let mut native = NativeAddress::new_empty();
		unsafe {
			(*native.as_sockaddr_mut()).sa_family = libc::AF_UNIX as libc::sa_family_t;
		}
		native.set_len(std::mem::size_of::<libc::sockaddr>() as libc::socklen_t);
		assert!(let Err(Error::AddressNotAvailable) = native.to_endpoint());
	}
}
