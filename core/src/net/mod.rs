/*
 * mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Filigrana, a compact event-driven HTTP/1.x
 * server and client.
 *
 * Filigrana is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Filigrana is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Filigrana.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Seam between the engine and the operating system. The engine only ever
//! sees a `NetStream`: a non-blocking bidirectional byte channel with an
//! `is_secure` flag. TLS providers implement `NetStream` plus the acceptor
//! and connector traits externally; the engine never touches handshakes or
//! certificate configuration.

pub mod poll;

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, RawFd};

use socket2::{Domain, Protocol, Socket, Type};

/// Non-blocking byte channel. `read` and `write` return `WouldBlock` when
/// the operation cannot make progress; `close` is idempotent.
pub trait NetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn close(&mut self);
    fn is_secure(&self) -> bool;
    fn raw_fd(&self) -> RawFd;
}

impl NetStream for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn close(&mut self) {
        let _ = self.shutdown(Shutdown::Both);
    }

    fn is_secure(&self) -> bool {
        false
    }

    fn raw_fd(&self) -> RawFd {
        self.as_raw_fd()
    }
}

/// Server-side TLS provider: wraps an accepted TCP stream. The returned
/// stream reports `is_secure` and drives its handshake inside read/write.
pub trait TlsAcceptor {
    fn accept(&self, stream: TcpStream) -> io::Result<Box<dyn NetStream>>;
}

/// Client-side TLS provider: wraps a connected TCP stream for `host`.
pub trait TlsConnector {
    fn connect(&self, host: &str, stream: TcpStream) -> io::Result<Box<dyn NetStream>>;
}

pub fn is_would_block(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
}

/// Bind non-blocking listeners for every address `address` resolves to.
/// Binding the IPv6 unspecified address gets `IPV6_V6ONLY` cleared so one
/// listener serves both families.
pub fn bind_listeners(address: &str, port: u16) -> io::Result<Vec<TcpListener>> {
    use std::net::ToSocketAddrs;
    let addrs: Vec<SocketAddr> = (address, port).to_socket_addrs()?.collect();
    let mut listeners = Vec::new();
    let mut last_err = None;
    for addr in addrs {
        match bind_one(addr) {
            Ok(l) => listeners.push(l),
            Err(e) => last_err = Some(e),
        }
    }
    if listeners.is_empty() {
        return Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolves to nothing")
        }));
    }
    Ok(listeners)
}

fn bind_one(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    if addr.is_ipv6() && addr.ip().is_unspecified() {
        socket.set_only_v6(false)?;
    }
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Begin a non-blocking connect. In-progress is not an error; completion is
/// signalled by writability and confirmed with `connect_check`.
pub fn connect_start(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nonblocking(true)?;
    match socket.connect(&addr.into()) {
        Ok(()) => {}
        Err(e) if connect_in_progress(&e) => {}
        Err(e) => return Err(e),
    }
    Ok(socket.into())
}

fn connect_in_progress(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock || e.raw_os_error() == Some(libc::EINPROGRESS)
}

/// After a connecting socket turns writable: did the connect succeed?
pub fn connect_check(stream: &TcpStream) -> io::Result<()> {
    match stream.take_error()? {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
