use assert2::assert;
use portable_socket::{Endpoint, Family, OpenFlags, UdpSettings, UdpSocket};
use std::time::Duration;

/// Poll a non-blocking receive until a datagram arrives.
fn recv_blocking(socket: &UdpSocket, buffer: &mut [u8]) -> (usize, Endpoint) {
	for _ in 0..500 {
		if let Some(received) = socket.recv_from(buffer).unwrap() {
			return received;
		}
		std::thread::sleep(Duration::from_millis(10));
	}
	panic!("no datagram arrived within five seconds");
}

#[test]
fn open_binds_to_an_ephemeral_port() {
	let local = Endpoint::inet4([0, 0, 0, 0], 0);
	let socket = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	let bound = socket.local_endpoint().unwrap();
	assert!(bound.family() == Family::Inet4);
	assert!(bound.port() != 0);

	assert!(let Ok(()) = socket.close());
}

#[test]
fn loopback_send_and_receive() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let a = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();
	let b = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	let b_endpoint = b.local_endpoint().unwrap();
	assert!(a.send_to(b"hello!", &b_endpoint).unwrap() == Some(6));

	let mut buffer = [0u8; 16];
	let (len, sender) = recv_blocking(&b, &mut buffer);
	assert!(&buffer[..len] == b"hello!");
	assert!(sender.family() == Family::Inet4);
	assert!(sender.port() == a.local_endpoint().unwrap().port());

	a.close().unwrap();
	b.close().unwrap();
}

#[test]
fn receive_on_an_idle_socket_is_not_ready() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let socket = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	let mut buffer = [0u8; 16];
	assert!(socket.recv_from(&mut buffer).unwrap() == None);

	socket.close().unwrap();
}

#[test]
fn reuse_address_allows_rebinding() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let first = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::REUSE_ADDRESS).unwrap();
	let bound = first.local_endpoint().unwrap();

	let second = UdpSocket::open(&bound, &UdpSettings::DEFAULT, OpenFlags::REUSE_ADDRESS).unwrap();

	first.close().unwrap();
	second.close().unwrap();
}

#[test]
fn ipv6_loopback_round_trip() {
	let mut loopback = [0u8; 16];
	loopback[15] = 1;
	let local = Endpoint::inet6(loopback, 0, 0);
	let a = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();
	let b = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();

	let b_endpoint = b.local_endpoint().unwrap();
	assert!(b_endpoint.family() == Family::Inet6);
	assert!(a.send_to(b"ping", &b_endpoint).unwrap() == Some(4));

	let mut buffer = [0u8; 16];
	let (len, sender) = recv_blocking(&b, &mut buffer);
	assert!(&buffer[..len] == b"ping");
	assert!(sender.family() == Family::Inet6);

	a.close().unwrap();
	b.close().unwrap();
}

#[test]
fn close_with_a_retry_ceiling_closes_an_idle_socket() {
	let local = Endpoint::inet4([127, 0, 0, 1], 0);
	let socket = UdpSocket::open(&local, &UdpSettings::DEFAULT, OpenFlags::empty()).unwrap();
	assert!(let Ok(()) = socket.close_with_retry_limit(Some(3)));
}
