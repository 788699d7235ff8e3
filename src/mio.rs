//! `mio` support.
//!
//! Implements [`mio::event::Source`] for the socket types so their
//! readiness can be polled through a [`mio::Poll`].

use mio::unix::SourceFd;
use std::os::unix::io::AsRawFd;

use crate::{TcpSocket, UdpSocket};

impl mio::event::Source for UdpSocket {
	fn register(&mut self, registry: &mio::Registry, token: mio::Token, interests: mio::Interest) -> std::io::Result<()> {
		SourceFd(&self.as_raw_fd()).register(registry, token, interests)
	}

	fn reregister(&mut self, registry: &mio::Registry, token: mio::Token, interests: mio::Interest) -> std::io::Result<()> {
		SourceFd(&self.as_raw_fd()).reregister(registry, token, interests)
	}

	fn deregister(&mut self, registry: &mio::Registry) -> std::io::Result<()> {
		SourceFd(&self.as_raw_fd()).deregister(registry)
	}
}

impl mio::event::Source for TcpSocket {
	fn register(&mut self, registry: &mio::Registry, token: mio::Token, interests: mio::Interest) -> std::io::Result<()> {
		SourceFd(&self.as_raw_fd()).register(registry, token, interests)
	}

	fn reregister(&mut self, registry: &mio::Registry, token: mio::Token, interests: mio::Interest) -> std::io::Result<()> {
		SourceFd(&self.as_raw_fd()).reregister(registry, token, interests)
	}

	fn deregister(&mut self, registry: &mio::Registry) -> std::io::Result<()> {
		SourceFd(&self.as_raw_fd()).deregister(registry)
	}
}
