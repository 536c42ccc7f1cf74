/*
 * response.rs
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

//! Response push parser: status line, headers, body sized by Content-Length.
//! A response without Content-Length is accepted only when the connection is
//! going to close (body ends at close); on a keep-alive connection that is a
//! protocol error. No chunked transfer coding.

use bytes::BytesMut;

use super::{find_eol, Protocol};
use crate::client::response::ClientResponse;
use crate::error::Error;
use crate::wire::cookie::parse_set_cookie;
use crate::wire::headers::split_header_line;

#[derive(Debug, Clone, Copy)]
pub struct ResponseLimits {
    /// Bytes from the status line through the blank line.
    pub max_headers_length: usize,
    /// Body bytes.
    pub max_body_length: usize,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            max_headers_length: 4096,
            max_body_length: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    StatusLine,
    Headers,
    Body,
    Complete,
}

/// Feed-and-drain response parser, one in-flight response at a time.
pub struct ResponseParser {
    limits: ResponseLimits,
    phase: Phase,
    head_len: usize,
    response: ClientResponse,
    content_length: Option<usize>,
    content_length_seen: Option<String>,
    /// The pending request was HEAD: the response has headers only.
    head_request: bool,
}

impl ResponseParser {
    pub fn new(limits: ResponseLimits) -> Self {
        Self {
            limits,
            phase: Phase::StatusLine,
            head_len: 0,
            response: ClientResponse::empty(),
            content_length: None,
            content_length_seen: None,
            head_request: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once any byte of the current response has been consumed.
    pub fn in_progress(&self) -> bool {
        self.head_len > 0 && self.phase != Phase::Complete
    }

    /// Tell the parser the request was HEAD before feeding the response.
    pub fn set_head_request(&mut self, head: bool) {
        self.head_request = head;
    }

    /// Keep-alive capability of the parsed response headers.
    pub fn keep_alive(&self) -> bool {
        self.response
            .protocol
            .keep_alive(self.response.headers.get("connection"))
    }

    /// Consume as much of `buf` as possible; true once the response is
    /// complete. Close-delimited bodies complete via `on_eof` instead.
    pub fn receive(&mut self, buf: &mut BytesMut) -> Result<bool, Error> {
        loop {
            match self.phase {
                Phase::StatusLine => {
                    let Some((eol, tlen)) = find_eol(buf, false) else {
                        self.check_head_budget(buf.len())?;
                        return Ok(false);
                    };
                    let line = buf.split_to(eol + tlen);
                    self.head_len += eol + tlen;
                    self.check_head_budget(0)?;
                    let line = std::str::from_utf8(&line[..eol])
                        .map_err(|_| Error::response("status line is not UTF-8"))?;
                    self.parse_status_line(line)?;
                    self.phase = Phase::Headers;
                }
                Phase::Headers => {
                    let Some((eol, tlen)) = find_eol(buf, false) else {
                        self.check_head_budget(buf.len())?;
                        return Ok(false);
                    };
                    let line = buf.split_to(eol + tlen);
                    self.head_len += eol + tlen;
                    self.check_head_budget(0)?;
                    if eol == 0 {
                        if self.finish_headers()? {
                            return Ok(true);
                        }
                        continue;
                    }
                    if line[0] == b' ' || line[0] == b'\t' {
                        return Err(Error::response("obsolete header folding"));
                    }
                    let line = std::str::from_utf8(&line[..eol])
                        .map_err(|_| Error::response("header line is not UTF-8"))?;
                    let (name, value) =
                        split_header_line(line).map_err(|e| Error::response(e.0))?;
                    self.store_header(name, value)?;
                }
                Phase::Body => match self.content_length {
                    Some(length) => {
                        if buf.is_empty() {
                            return Ok(false);
                        }
                        let needed = length - self.response.body.len();
                        let take = needed.min(buf.len());
                        let chunk = buf.split_to(take);
                        self.response.body.extend_from_slice(&chunk);
                        if self.response.body.len() == length {
                            self.phase = Phase::Complete;
                            return Ok(true);
                        }
                        return Ok(false);
                    }
                    None => {
                        // body ends at close
                        if self.response.body.len() + buf.len() > self.limits.max_body_length {
                            return Err(Error::TooLarge("response body"));
                        }
                        self.response.body.extend_from_slice(buf);
                        buf.clear();
                        return Ok(false);
                    }
                },
                Phase::Complete => return Ok(true),
            }
        }
    }

    /// The peer closed the connection. Completes a close-delimited body;
    /// anything else mid-response is a transport error.
    pub fn on_eof(&mut self) -> Result<bool, Error> {
        match self.phase {
            Phase::Body if self.content_length.is_none() => {
                self.phase = Phase::Complete;
                Ok(true)
            }
            Phase::Complete => Ok(true),
            _ => Err(Error::connection("connection closed mid-response")),
        }
    }

    /// Hand the decoded response over and reset for the next one.
    pub fn take_response(&mut self) -> ClientResponse {
        let response = std::mem::replace(&mut self.response, ClientResponse::empty());
        self.phase = Phase::StatusLine;
        self.head_len = 0;
        self.content_length = None;
        self.content_length_seen = None;
        self.head_request = false;
        response
    }

    fn check_head_budget(&self, pending: usize) -> Result<(), Error> {
        if self.head_len + pending > self.limits.max_headers_length {
            return Err(Error::TooLarge("response headers"));
        }
        Ok(())
    }

    fn parse_status_line(&mut self, line: &str) -> Result<(), Error> {
        let mut parts = line.splitn(3, ' ');
        let proto = parts.next().unwrap_or("");
        self.response.protocol = Protocol::from_token(proto)
            .ok_or_else(|| Error::response("unsupported protocol in status line"))?;
        let code = parts
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| Error::response("malformed status code"))?;
        if !(100..=599).contains(&code) {
            return Err(Error::response("status code out of range"));
        }
        self.response.status = code;
        self.response.reason = parts.next().unwrap_or("").to_string();
        Ok(())
    }

    fn store_header(&mut self, name: String, value: String) -> Result<(), Error> {
        match name.as_str() {
            "content-length" => {
                if let Some(seen) = &self.content_length_seen {
                    if *seen != value {
                        return Err(Error::response("conflicting Content-Length"));
                    }
                }
                self.content_length_seen = Some(value.clone());
            }
            "transfer-encoding" => {
                if !value.eq_ignore_ascii_case("identity") {
                    return Err(Error::response("transfer encoding not supported"));
                }
            }
            "set-cookie" => {
                if let Some((n, v)) = parse_set_cookie(&value) {
                    self.response.cookies.set(n, v);
                }
            }
            _ => {}
        }
        self.response.headers.set(name, value);
        Ok(())
    }

    /// Returns true when the response is already complete (no body).
    fn finish_headers(&mut self) -> Result<bool, Error> {
        let status = self.response.status;
        let bodyless = self.head_request || status == 204 || status == 304 || status / 100 == 1;
        if bodyless {
            self.phase = Phase::Complete;
            return Ok(true);
        }
        self.content_length = match &self.content_length_seen {
            Some(v) => {
                if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::response("invalid Content-Length"));
                }
                let n: usize = v
                    .parse()
                    .map_err(|_| Error::response("invalid Content-Length"))?;
                if n > self.limits.max_body_length {
                    return Err(Error::TooLarge("response body"));
                }
                Some(n)
            }
            None => {
                if self.keep_alive() {
                    return Err(Error::response(
                        "keep-alive response without Content-Length",
                    ));
                }
                None
            }
        };
        if self.content_length == Some(0) {
            self.phase = Phase::Complete;
            return Ok(true);
        }
        self.phase = Phase::Body;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ResponseParser {
        ResponseParser::new(ResponseLimits::default())
    }

    #[test]
    fn simple_response() {
        let mut p = parser();
        let mut buf = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok"[..],
        );
        assert!(p.receive(&mut buf).unwrap());
        let r = p.take_response();
        assert_eq!(r.status(), 200);
        assert_eq!(r.reason(), "OK");
        assert_eq!(r.header("content-type"), Some("text/plain"));
        assert_eq!(r.body(), b"ok");
    }

    #[test]
    fn split_across_feeds() {
        let mut p = parser();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"HTTP/1.1 404 Not ");
        assert!(!p.receive(&mut buf).unwrap());
        buf.extend_from_slice(b"Found\r\nContent-Length: 4\r\n\r\nbo");
        assert!(!p.receive(&mut buf).unwrap());
        buf.extend_from_slice(b"dy!");
        assert!(p.receive(&mut buf).unwrap());
        let r = p.take_response();
        assert_eq!(r.status(), 404);
        assert_eq!(r.reason(), "Not Found");
        assert_eq!(r.body(), b"body");
        // leftover byte belongs to the next response
        assert_eq!(&buf[..], b"!");
    }

    #[test]
    fn close_delimited_body() {
        let mut p = parser();
        let mut buf = BytesMut::from(
            &b"HTTP/1.0 200 OK\r\nConnection: close\r\n\r\npartial"[..],
        );
        assert!(!p.receive(&mut buf).unwrap());
        assert!(p.on_eof().unwrap());
        assert_eq!(p.take_response().body(), b"partial");
    }

    #[test]
    fn keep_alive_without_length_is_protocol_error() {
        let mut p = parser();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\n\r\nbody"[..]);
        assert!(matches!(p.receive(&mut buf), Err(Error::Response(_))));
    }

    #[test]
    fn eof_mid_headers_is_connection_error() {
        let mut p = parser();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-"[..]);
        assert!(!p.receive(&mut buf).unwrap());
        assert!(matches!(p.on_eof(), Err(Error::Connection(_))));
    }

    #[test]
    fn head_response_has_no_body() {
        let mut p = parser();
        p.set_head_request(true);
        let mut buf =
            BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n"[..]);
        assert!(p.receive(&mut buf).unwrap());
        assert!(p.take_response().body().is_empty());
    }

    #[test]
    fn no_content_statuses_have_no_body() {
        for status in ["204 No Content", "304 Not Modified"] {
            let mut p = parser();
            let raw = format!("HTTP/1.1 {}\r\n\r\n", status);
            let mut buf = BytesMut::from(raw.as_bytes());
            assert!(p.receive(&mut buf).unwrap());
        }
    }

    #[test]
    fn set_cookie_collected() {
        let mut p = parser();
        let mut buf = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1; Path=/\r\nSet-Cookie: b=2\r\nContent-Length: 0\r\n\r\n"[..],
        );
        assert!(p.receive(&mut buf).unwrap());
        let r = p.take_response();
        assert_eq!(r.cookie("a"), Some("1"));
        assert_eq!(r.cookie("b"), Some("2"));
    }

    #[test]
    fn chunked_rejected() {
        let mut p = parser();
        let mut buf = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"[..],
        );
        assert!(matches!(p.receive(&mut buf), Err(Error::Response(_))));
    }

    #[test]
    fn oversized_body_rejected() {
        let mut p = ResponseParser::new(ResponseLimits {
            max_body_length: 4,
            ..ResponseLimits::default()
        });
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n"[..]);
        assert!(matches!(p.receive(&mut buf), Err(Error::TooLarge(_))));
    }

    #[test]
    fn oversized_headers_rejected() {
        let mut p = ResponseParser::new(ResponseLimits {
            max_headers_length: 32,
            ..ResponseLimits::default()
        });
        let raw = format!("HTTP/1.1 200 OK\r\nX-Pad: {}\r\n\r\n", "y".repeat(64));
        let mut buf = BytesMut::from(raw.as_bytes());
        assert!(matches!(p.receive(&mut buf), Err(Error::TooLarge(_))));
    }

    #[test]
    fn garbage_status_line() {
        for raw in ["SIP/2.0 200 OK\r\n\r\n", "HTTP/1.1 banana OK\r\n\r\n", "HTTP/1.1 99 Low\r\n\r\n"] {
            let mut p = parser();
            let mut buf = BytesMut::from(raw.as_bytes());
            assert!(matches!(p.receive(&mut buf), Err(Error::Response(_))), "{}", raw);
        }
    }
}
