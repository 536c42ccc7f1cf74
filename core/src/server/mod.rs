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

//! Event-driven HTTP server. The server owns the listen sockets and one
//! state machine per connection; the caller owns the readiness loop. Expose
//! `read_sockets`/`write_sockets` to the caller's multiplexer and feed the
//! ready sets to `process_events`, or use `wait` to let the server poll for
//! itself. Requests surface in arrival order, at most one per connection per
//! call; responses go out through the respond family keyed by `ClientId`.

mod connection;
mod encoder;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::Response;

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};
use crate::net::{self, poll, NetStream, TlsAcceptor};
use crate::timer;
use connection::Connection;

/// Handle identifying one accepted connection.
pub type ClientId = RawFd;

/// Server tuning; every field has a default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Accepted connections beyond this are closed immediately.
    pub max_waiting_clients: usize,
    pub keep_alive_timeout: Duration,
    pub keep_alive_max_requests: u32,
    /// Cap on request line plus headers, in bytes.
    pub max_headers_length: usize,
    /// Cap on a request body, in bytes.
    pub max_content_length: usize,
    /// Accept bare-LF line endings.
    pub lenient_eol: bool,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            max_waiting_clients: 5,
            keep_alive_timeout: Duration::from_secs(30),
            keep_alive_max_requests: 100,
            max_headers_length: 4096,
            max_content_length: 512 * 1024,
            lenient_eol: false,
        }
    }
}

pub struct Server {
    config: ServerConfig,
    listeners: Vec<TcpListener>,
    tls: Option<Box<dyn TlsAcceptor>>,
    connections: HashMap<ClientId, Connection>,
}

impl Server {
    /// Bind non-blocking listeners per the configured address (dual-stack
    /// when binding `::`).
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let listeners = net::bind_listeners(&config.address, config.port)?;
        for l in &listeners {
            if let Ok(addr) = l.local_addr() {
                debug!("listening on {}", addr);
            }
        }
        Ok(Self {
            config,
            listeners,
            tls: None,
            connections: HashMap::new(),
        })
    }

    /// Bind with an external TLS provider wrapping every accepted stream.
    pub fn bind_with_tls(config: ServerConfig, acceptor: Box<dyn TlsAcceptor>) -> io::Result<Self> {
        let mut server = Self::bind(config)?;
        server.tls = Some(acceptor);
        Ok(server)
    }

    /// Local addresses actually bound (useful with port 0).
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|l| l.local_addr().ok())
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Sockets the caller should select for readability: the listeners plus
    /// every connection that can make progress by reading.
    pub fn read_sockets(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = self.listeners.iter().map(|l| l.as_raw_fd()).collect();
        fds.extend(
            self.connections
                .iter()
                .filter(|(_, c)| c.wants_read())
                .map(|(&fd, _)| fd),
        );
        fds
    }

    /// Sockets with pending outbound bytes, exactly.
    pub fn write_sockets(&self) -> Vec<RawFd> {
        self.connections
            .iter()
            .filter(|(_, c)| c.wants_write())
            .map(|(&fd, _)| fd)
            .collect()
    }

    /// Dispatch readiness: accept, read and parse, drain writes, sweep
    /// deadlines. Returns completed requests, at most one per connection.
    pub fn process_events(
        &mut self,
        readable: &[RawFd],
        writable: &[RawFd],
    ) -> Vec<(ClientId, Request)> {
        for i in 0..self.listeners.len() {
            if readable.contains(&self.listeners[i].as_raw_fd()) {
                self.accept_ready(i);
            }
        }
        for &fd in readable {
            if let Some(c) = self.connections.get_mut(&fd) {
                c.on_readable(&self.config);
            }
        }
        for &fd in writable {
            if let Some(c) = self.connections.get_mut(&fd) {
                c.on_writable(&self.config);
            }
        }
        let now = Instant::now();
        for c in self.connections.values_mut() {
            c.sweep(now);
        }
        let mut events = Vec::new();
        for (&fd, c) in self.connections.iter_mut() {
            if let Some(request) = c.take_ready() {
                events.push((fd, request));
            }
        }
        self.connections.retain(|_, c| !c.is_closed());
        events
    }

    /// Blocking convenience: poll for readiness once (bounded by the nearest
    /// idle deadline) and process it.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<(ClientId, Request)>> {
        let budget = timer::min_remaining(self.nearest_deadline(), timeout);
        let ready = poll::wait_readiness(&self.read_sockets(), &self.write_sockets(), budget)?;
        Ok(self.process_events(&ready.readable, &ready.writable))
    }

    fn nearest_deadline(&self) -> Option<crate::timer::Deadline> {
        self.connections
            .values()
            .filter_map(|c| c.idle_deadline())
            .min_by_key(|d| d.remaining(Instant::now()))
    }

    fn accept_ready(&mut self, index: usize) {
        loop {
            match self.listeners[index].accept() {
                Ok((stream, peer)) => {
                    if self.connections.len() >= self.config.max_waiting_clients {
                        debug!("rejecting connection from {}: server at capacity", peer);
                        drop(stream);
                        continue;
                    }
                    if stream.set_nonblocking(true).is_err() {
                        continue;
                    }
                    let stream: Box<dyn NetStream> = match &self.tls {
                        Some(acceptor) => match acceptor.accept(stream) {
                            Ok(s) => s,
                            Err(e) => {
                                debug!("TLS accept from {} failed: {}", peer, e);
                                continue;
                            }
                        },
                        None => Box::new(stream),
                    };
                    let fd = stream.raw_fd();
                    debug!("accepted connection from {}", peer);
                    self.connections
                        .insert(fd, Connection::new(stream, peer, &self.config));
                }
                Err(e) if net::is_would_block(&e) => break,
                Err(e) => {
                    debug!("accept error: {}", e);
                    break;
                }
            }
        }
    }

    fn connection(&mut self, client: ClientId) -> Result<&mut Connection> {
        self.connections
            .get_mut(&client)
            .ok_or(Error::State("unknown client"))
    }

    /// Queue a plain response for the given client's pending request.
    pub fn respond(&mut self, client: ClientId, response: Response) -> Result<()> {
        self.connection(client)?.respond(response)
    }

    /// Queue a redirect; `code` overrides 302 and must be one of
    /// 301, 302, 303, 307, 308.
    pub fn respond_redirect(
        &mut self,
        client: ClientId,
        location: &str,
        code: Option<u16>,
    ) -> Result<()> {
        self.connection(client)?.respond_redirect(location, code)
    }

    /// Stream a file from disk; Content-Type follows the extension and the
    /// body is fed into the outbound buffer in bounded chunks as it drains.
    pub fn respond_file(&mut self, client: ClientId, path: impl AsRef<Path>) -> Result<()> {
        self.connection(client)?.respond_file(path.as_ref())
    }

    /// Open a multipart/x-mixed-replace session. The connection will not be
    /// recycled; it closes after `multipart_end`.
    pub fn respond_multipart(&mut self, client: ClientId) -> Result<()> {
        self.connection(client)?.respond_multipart()
    }

    /// Emit one multipart frame. Content-Length defaults to the payload
    /// size. Fails once the outbound buffer is over the soft cap.
    pub fn multipart_frame(
        &mut self,
        client: ClientId,
        headers: &[(&str, &str)],
        payload: &[u8],
    ) -> Result<()> {
        self.connection(client)?.multipart_frame(headers, payload)
    }

    /// Terminate the multipart session with the end sentinel.
    pub fn multipart_end(&mut self, client: ClientId) -> Result<()> {
        self.connection(client)?.multipart_end()
    }

    /// Force-close a connection. Idempotent; unknown ids are ignored.
    pub fn close(&mut self, client: ClientId) {
        if let Some(c) = self.connections.get_mut(&client) {
            c.close();
        }
        self.connections.retain(|_, c| !c.is_closed());
    }

    pub fn client_addr(&self, client: ClientId) -> Option<SocketAddr> {
        self.connections.get(&client).map(|c| c.peer())
    }

    pub fn is_secure(&self, client: ClientId) -> Option<bool> {
        self.connections.get(&client).map(|c| c.is_secure())
    }
}
