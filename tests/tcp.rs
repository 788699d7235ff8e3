use assert2::assert;
use portable_socket::{Endpoint, Error, Family, OpenFlags, TcpSettings, TcpSocket};

#[test]
fn open_binds_and_closes_like_udp() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let socket = TcpSocket::open(&local, &TcpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	let bound = socket.local_endpoint().unwrap();
	assert!(bound.family() == Family::Inet4);
	assert!(bound.port() != 0);

	assert!(let Ok(()) = socket.close());
}

#[test]
fn listen_is_not_implemented_yet() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let socket = TcpSocket::open(&local, &TcpSettings::DEFAULT, OpenFlags::empty()).unwrap();
	assert!(let Err(Error::NotImplemented) = socket.listen());
	socket.close().unwrap();
}

#[test]
fn connect_validates_before_reporting_not_implemented() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let socket = TcpSocket::open(&local, &TcpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	// Family mismatch fails validation first.
	let v6_peer = Endpoint::inet6([0; 16], 80, 0);
	assert!(let Err(Error::InvalidArgument) = socket.connect(&v6_peer));

	let peer = Endpoint::inet4([127, 0, 0, 1], 80);
	assert!(let Err(Error::NotImplemented) = socket.connect(&peer));

	socket.close().unwrap();
}

#[test]
fn options_have_no_translation_rows_yet() {
	use portable_socket::SocketOption;

	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let socket = TcpSocket::open(&local, &TcpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	let mut value = [0u8; 4];
	assert!(let Err(Error::NotImplemented) = socket.set_option(SocketOption::SendBufferSize, &value));
	assert!(let Err(Error::NotImplemented) = socket.get_option(SocketOption::RecvBufferSize, &mut value));

	socket.close().unwrap();
}
