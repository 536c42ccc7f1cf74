/*
 * connection.rs
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

//! Per-connection server state machine. One in-flight request at a time;
//! pipelined follow-on bytes stay in the inbound buffer and are re-parsed
//! after the response is flushed. A fatal parse error emits one canned
//! response and poisons the connection; nothing further is parsed on it.

use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Instant;

use bytes::{Buf, BytesMut};
use log::{debug, trace};

use super::encoder;
use super::request::Request;
use super::response::Response;
use super::ServerConfig;
use crate::error::{Error, Result};
use crate::h1::request::Phase;
use crate::h1::{Method, RequestLimits, RequestParser};
use crate::net::{is_would_block, NetStream};
use crate::timer::Deadline;

const READ_CHUNK: usize = 8192;
const MAX_READ_PER_TURN: usize = 64 * 1024;
const FILE_CHUNK: usize = 32 * 1024;
const OUTBOUND_LOW_WATER: usize = 8 * 1024;
/// Above this, further multipart frames are refused instead of buffered.
const OUTBOUND_SOFT_CAP: usize = 1024 * 1024;

/// Redirect statuses a caller may override 302 with.
const REDIRECT_STATUSES: &[u16] = &[301, 302, 303, 307, 308];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnState {
    ReadHeaders,
    ReadBody,
    Dispatch,
    Writing,
    Idle,
    Closing,
}

/// Context of the request currently awaiting its response.
struct Turn {
    keep_alive: bool,
    head_only: bool,
}

struct FileStream {
    file: File,
    remaining: u64,
}

pub(crate) struct Connection {
    stream: Box<dyn NetStream>,
    peer: SocketAddr,
    state: ConnState,
    inbound: BytesMut,
    outbound: BytesMut,
    parser: RequestParser,
    inbound_cap: usize,
    /// Completed request not yet surfaced to the caller.
    ready: Option<Request>,
    turn: Option<Turn>,
    requests_served: u32,
    idle_deadline: Option<Deadline>,
    close_after_flush: bool,
    poisoned: bool,
    file: Option<FileStream>,
    /// Boundary of an open multipart session.
    multipart: Option<String>,
    closed: bool,
}

impl Connection {
    pub fn new(stream: Box<dyn NetStream>, peer: SocketAddr, config: &ServerConfig) -> Self {
        let limits = RequestLimits {
            max_headers_length: config.max_headers_length,
            max_content_length: config.max_content_length,
            lenient_eol: config.lenient_eol,
        };
        Self {
            stream,
            peer,
            state: ConnState::ReadHeaders,
            inbound: BytesMut::with_capacity(READ_CHUNK),
            outbound: BytesMut::new(),
            parser: RequestParser::new(limits),
            inbound_cap: config.max_headers_length + config.max_content_length + READ_CHUNK,
            ready: None,
            turn: None,
            requests_served: 0,
            idle_deadline: None,
            close_after_flush: false,
            poisoned: false,
            file: None,
            multipart: None,
            closed: false,
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.stream.raw_fd()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_secure(&self) -> bool {
        self.stream.is_secure()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn wants_read(&self) -> bool {
        !self.closed && !self.poisoned && self.inbound.len() < self.inbound_cap
    }

    pub fn wants_write(&self) -> bool {
        !self.closed && !self.outbound.is_empty()
    }

    pub fn take_ready(&mut self) -> Option<Request> {
        self.ready.take()
    }

    /// Armed idle deadline, if the connection is parked in keep-alive wait.
    pub fn idle_deadline(&self) -> Option<Deadline> {
        match self.state {
            ConnState::Idle => self.idle_deadline,
            _ => None,
        }
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        trace!("closing connection from {}", self.peer);
        self.stream.close();
        self.closed = true;
        self.state = ConnState::Closing;
        self.file = None;
    }

    /// Bounded read into the inbound buffer, then incremental parse.
    pub fn on_readable(&mut self, config: &ServerConfig) {
        if self.closed {
            return;
        }
        let mut total = 0;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if self.inbound.len() >= self.inbound_cap || total >= MAX_READ_PER_TURN {
                break;
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.on_peer_eof();
                    return;
                }
                Ok(n) => {
                    self.inbound.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(e) if is_would_block(&e) => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("read error from {}: {}", self.peer, e);
                    self.close();
                    return;
                }
            }
        }
        self.advance_parse(config);
    }

    fn on_peer_eof(&mut self) {
        // a truncated in-flight request can never complete
        if self.parser.in_progress() {
            debug!("connection from {} closed mid-request", self.peer);
            self.close();
            return;
        }
        // let any queued response drain before shutting down
        if self.outbound.is_empty() && self.turn.is_none() && self.ready.is_none() {
            self.close();
        } else {
            self.close_after_flush = true;
        }
    }

    /// Run the parser over buffered bytes while no request is in flight.
    fn advance_parse(&mut self, config: &ServerConfig) {
        if self.closed || self.poisoned || self.ready.is_some() || self.turn.is_some() {
            return;
        }
        match self.parser.receive(&mut self.inbound) {
            Ok(true) => {
                let request = self.parser.take_request();
                self.requests_served += 1;
                let mut keep_alive = request
                    .protocol()
                    .keep_alive(request.header("connection"));
                if self.requests_served >= config.keep_alive_max_requests {
                    keep_alive = false;
                }
                trace!(
                    "request {} {} from {} (#{}, keep-alive {})",
                    request.method(),
                    request.url(),
                    self.peer,
                    self.requests_served,
                    keep_alive
                );
                self.turn = Some(Turn {
                    keep_alive,
                    head_only: request.method() == Method::Head,
                });
                self.ready = Some(request);
                self.idle_deadline = None;
                self.state = ConnState::Dispatch;
            }
            Ok(false) => {
                if self.parser.phase() == Phase::Body {
                    self.state = ConnState::ReadBody;
                } else if self.parser.in_progress() {
                    self.state = ConnState::ReadHeaders;
                    self.idle_deadline = None;
                }
            }
            Err(e) => {
                debug!(
                    "parse error from {}: {} {} - closing",
                    self.peer, e.status, e.message
                );
                self.poisoned = true;
                encoder::encode_error(&mut self.outbound, e.status, e.message);
                self.close_after_flush = true;
                self.state = ConnState::Writing;
            }
        }
    }

    /// Drain the outbound buffer; refill it from an active file stream; on
    /// full flush either recycle the connection (keep-alive, pipelining) or
    /// close it.
    pub fn on_writable(&mut self, config: &ServerConfig) {
        if self.closed {
            return;
        }
        loop {
            while !self.outbound.is_empty() {
                match self.stream.write(&self.outbound) {
                    Ok(0) => {
                        self.close();
                        return;
                    }
                    Ok(n) => self.outbound.advance(n),
                    Err(e) if is_would_block(&e) => return,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("write error to {}: {}", self.peer, e);
                        self.close();
                        return;
                    }
                }
            }
            if !self.refill_from_file() {
                break;
            }
        }
        if self.outbound.is_empty() && self.file.is_none() {
            self.on_flushed(config);
        }
    }

    /// Pull the next chunk of an active file stream into the outbound
    /// buffer. Returns true when bytes were added.
    fn refill_from_file(&mut self) -> bool {
        if self.outbound.len() >= OUTBOUND_LOW_WATER {
            return false;
        }
        let Some(fs) = self.file.as_mut() else {
            return false;
        };
        let want = (fs.remaining as usize).min(FILE_CHUNK);
        if want == 0 {
            self.file = None;
            return false;
        }
        let mut chunk = vec![0u8; want];
        match fs.file.read(&mut chunk) {
            Ok(0) => {
                // file shrank under us; the promised Content-Length cannot
                // be met, so the connection must die
                debug!("file stream truncated for {}", self.peer);
                self.close();
                false
            }
            Ok(n) => {
                fs.remaining -= n as u64;
                if fs.remaining == 0 {
                    self.file = None;
                }
                self.outbound.extend_from_slice(&chunk[..n]);
                true
            }
            Err(e) => {
                debug!("file stream error for {}: {}", self.peer, e);
                self.close();
                false
            }
        }
    }

    fn on_flushed(&mut self, config: &ServerConfig) {
        if self.multipart.is_some() {
            // mid-session; more frames may come
            return;
        }
        if self.close_after_flush {
            self.close();
            return;
        }
        if self.turn.is_some() || self.ready.is_some() || self.state != ConnState::Writing {
            return;
        }
        self.state = ConnState::Idle;
        self.idle_deadline = Some(Deadline::after(config.keep_alive_timeout));
        if !self.inbound.is_empty() {
            // pipelined bytes: parse the next request right away
            self.state = ConnState::ReadHeaders;
            self.advance_parse(config);
        }
    }

    /// Deadline check at a readiness boundary.
    pub fn sweep(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if self.state == ConnState::Idle {
            if let Some(d) = self.idle_deadline {
                if d.expired(now) {
                    debug!("closing idle connection from {}", self.peer);
                    self.close();
                }
            }
        }
    }

    fn take_turn(&mut self) -> Result<Turn> {
        if self.state != ConnState::Dispatch {
            return Err(Error::State("no request awaiting a response"));
        }
        self.turn
            .take()
            .ok_or(Error::State("no request awaiting a response"))
    }

    pub fn respond(&mut self, response: Response) -> Result<()> {
        let turn = self.take_turn()?;
        encoder::encode_response(&mut self.outbound, response, turn.keep_alive, turn.head_only);
        self.finish_queue(turn.keep_alive);
        Ok(())
    }

    pub fn respond_redirect(&mut self, location: &str, code: Option<u16>) -> Result<()> {
        let code = code.unwrap_or(302);
        if !REDIRECT_STATUSES.contains(&code) {
            return Err(Error::State("not a redirect status"));
        }
        let turn = self.take_turn()?;
        encoder::encode_redirect(&mut self.outbound, location, code, turn.keep_alive);
        self.finish_queue(turn.keep_alive);
        Ok(())
    }

    pub fn respond_file(&mut self, path: &std::path::Path) -> Result<()> {
        if self.state != ConnState::Dispatch || self.turn.is_none() {
            return Err(Error::State("no request awaiting a response"));
        }
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        let turn = self.take_turn()?;
        encoder::encode_file_head(
            &mut self.outbound,
            crate::wire::mime::for_path(path),
            length,
            turn.keep_alive,
        );
        if !turn.head_only && length > 0 {
            self.file = Some(FileStream {
                file,
                remaining: length,
            });
        }
        self.finish_queue(turn.keep_alive);
        Ok(())
    }

    pub fn respond_multipart(&mut self) -> Result<()> {
        let _turn = self.take_turn()?;
        let boundary = encoder::make_boundary();
        encoder::encode_multipart_head(&mut self.outbound, 200, &boundary);
        self.multipart = Some(boundary);
        // multipart sessions never recycle the connection
        self.finish_queue(false);
        Ok(())
    }

    pub fn multipart_frame(&mut self, headers: &[(&str, &str)], payload: &[u8]) -> Result<()> {
        let Some(boundary) = self.multipart.clone() else {
            return Err(Error::State("no open multipart session"));
        };
        if self.closed {
            return Err(Error::connection("connection is closed"));
        }
        if self.outbound.len() > OUTBOUND_SOFT_CAP {
            return Err(Error::State("outbound buffer over multipart soft cap"));
        }
        encoder::encode_multipart_frame(&mut self.outbound, &boundary, headers, payload);
        Ok(())
    }

    pub fn multipart_end(&mut self) -> Result<()> {
        if self.multipart.take().is_none() {
            return Err(Error::State("no open multipart session"));
        }
        encoder::encode_multipart_end(&mut self.outbound);
        Ok(())
    }

    fn finish_queue(&mut self, keep_alive: bool) {
        if !keep_alive {
            self.close_after_flush = true;
        }
        self.state = ConnState::Writing;
    }
}
