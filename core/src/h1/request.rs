/*
 * request.rs
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

//! Request push parser: request line, headers, body of exactly
//! Content-Length bytes. Enforces the header and body caps and the framing
//! defenses (conflicting Content-Length, non-identity Transfer-Encoding).
//! Bytes past the current request stay in the feed buffer; they belong to
//! the next pipelined request.

use bytes::BytesMut;

use super::{find_eol, Method, Protocol};
use crate::server::request::Request;
use crate::wire::cookie::parse_cookie_header;
use crate::wire::headers::split_header_line;
use crate::wire::{query, url};

/// Parser caps; exceeding one is fatal for the connection.
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    /// Bytes from the request line through the blank line.
    pub max_headers_length: usize,
    /// Body bytes (Content-Length).
    pub max_content_length: usize,
    /// Accept bare LF line endings.
    pub lenient_eol: bool,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_headers_length: 4096,
            max_content_length: 512 * 1024,
            lenient_eol: false,
        }
    }
}

/// Fatal parse failure: the connection answers with this status and closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestError {
    pub status: u16,
    pub message: &'static str,
}

impl RequestError {
    fn malformed(message: &'static str) -> Self {
        Self {
            status: 400,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    RequestLine,
    Headers,
    Body,
    Complete,
}

/// Feed-and-drain request parser. One instance per connection, reset by
/// `take_request` after each framed request.
pub struct RequestParser {
    limits: RequestLimits,
    phase: Phase,
    head_len: usize,
    request: Request,
    content_length: usize,
    content_length_seen: Option<String>,
}

impl RequestParser {
    pub fn new(limits: RequestLimits) -> Self {
        Self {
            limits,
            phase: Phase::RequestLine,
            head_len: 0,
            request: Request::empty(),
            content_length: 0,
            content_length_seen: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True while the parser is mid-request (bytes consumed, not complete).
    pub fn in_progress(&self) -> bool {
        self.head_len > 0 && self.phase != Phase::Complete
    }

    /// Consume as much of `buf` as possible. Returns true once a request is
    /// fully framed; remaining bytes are the next pipelined request's.
    pub fn receive(&mut self, buf: &mut BytesMut) -> Result<bool, RequestError> {
        loop {
            match self.phase {
                Phase::RequestLine => {
                    let Some((eol, tlen)) = find_eol(buf, self.limits.lenient_eol) else {
                        self.check_head_budget(buf.len())?;
                        return Ok(false);
                    };
                    let line = buf.split_to(eol + tlen);
                    self.head_len += eol + tlen;
                    self.check_head_budget(0)?;
                    if eol == 0 {
                        // stray CRLF before the request line (RFC 7230 §3.5)
                        continue;
                    }
                    let line = std::str::from_utf8(&line[..eol])
                        .map_err(|_| RequestError::malformed("request line is not UTF-8"))?;
                    self.parse_request_line(line)?;
                    self.phase = Phase::Headers;
                }
                Phase::Headers => {
                    let Some((eol, tlen)) = find_eol(buf, self.limits.lenient_eol) else {
                        self.check_head_budget(buf.len())?;
                        return Ok(false);
                    };
                    let line = buf.split_to(eol + tlen);
                    self.head_len += eol + tlen;
                    self.check_head_budget(0)?;
                    if eol == 0 {
                        self.finish_headers()?;
                        if self.content_length == 0 {
                            self.finalize()?;
                            return Ok(true);
                        }
                        self.phase = Phase::Body;
                        continue;
                    }
                    if line[0] == b' ' || line[0] == b'\t' {
                        return Err(RequestError::malformed("obsolete header folding"));
                    }
                    let line = std::str::from_utf8(&line[..eol])
                        .map_err(|_| RequestError::malformed("header line is not UTF-8"))?;
                    let (name, value) =
                        split_header_line(line).map_err(|e| RequestError::malformed(e.0))?;
                    self.store_header(name, value)?;
                }
                Phase::Body => {
                    if buf.is_empty() {
                        return Ok(false);
                    }
                    let needed = self.content_length - self.request.body.len();
                    let take = needed.min(buf.len());
                    let chunk = buf.split_to(take);
                    self.request.body.extend_from_slice(&chunk);
                    if self.request.body.len() == self.content_length {
                        self.finalize()?;
                        return Ok(true);
                    }
                    return Ok(false);
                }
                Phase::Complete => return Ok(true),
            }
        }
    }

    /// Hand the framed request over and reset for the next one.
    pub fn take_request(&mut self) -> Request {
        let request = std::mem::replace(&mut self.request, Request::empty());
        self.phase = Phase::RequestLine;
        self.head_len = 0;
        self.content_length = 0;
        self.content_length_seen = None;
        request
    }

    fn check_head_budget(&self, pending: usize) -> Result<(), RequestError> {
        if self.head_len + pending > self.limits.max_headers_length {
            return Err(RequestError::malformed("request headers too large"));
        }
        Ok(())
    }

    fn parse_request_line(&mut self, line: &str) -> Result<(), RequestError> {
        let parts: Vec<&str> = line.split(' ').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(RequestError::malformed("malformed request line"));
        }
        self.request.method = Method::from_token(parts[0]).ok_or(RequestError {
            status: 405,
            message: "method not allowed",
        })?;
        self.request.url = parts[1].to_string();
        self.request.protocol = Protocol::from_token(parts[2]).ok_or(RequestError {
            status: 505,
            message: "protocol version not supported",
        })?;
        Ok(())
    }

    fn store_header(&mut self, name: String, value: String) -> Result<(), RequestError> {
        match name.as_str() {
            "content-length" => {
                if let Some(seen) = &self.content_length_seen {
                    if *seen != value {
                        return Err(RequestError::malformed("conflicting Content-Length"));
                    }
                }
                self.content_length_seen = Some(value.clone());
            }
            "transfer-encoding" => {
                if !value.eq_ignore_ascii_case("identity") {
                    return Err(RequestError {
                        status: 501,
                        message: "transfer encoding not supported",
                    });
                }
            }
            "cookie" => {
                // merge; repeated Cookie headers accumulate, later wins
                parse_cookie_header(&value, &mut self.request.cookies);
            }
            _ => {}
        }
        self.request.headers.set(name, value);
        Ok(())
    }

    fn finish_headers(&mut self) -> Result<(), RequestError> {
        if self.request.protocol == Protocol::Http11 && !self.request.headers.contains("host") {
            return Err(RequestError::malformed("missing Host header"));
        }
        self.content_length = match &self.content_length_seen {
            Some(v) => {
                if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(RequestError::malformed("invalid Content-Length"));
                }
                let n: usize = v
                    .parse()
                    .map_err(|_| RequestError::malformed("invalid Content-Length"))?;
                if n > self.limits.max_content_length {
                    return Err(RequestError {
                        status: 413,
                        message: "request body too large",
                    });
                }
                n
            }
            None => 0,
        };
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RequestError> {
        let (path, raw_query) = url::split_request_url(&self.request.url)
            .map_err(|e| RequestError::malformed(e.0))?;
        self.request.path = path;
        if let Some(raw) = raw_query {
            query::parse_into(&raw, &mut self.request.query)
                .map_err(|e| RequestError::malformed(e.0))?;
        }
        self.request.content_length = self.content_length;
        self.request.loaded = true;
        self.phase = Phase::Complete;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut RequestParser, data: &[u8]) -> Result<bool, RequestError> {
        let mut buf = BytesMut::from(data);
        parser.receive(&mut buf)
    }

    fn parse_one(data: &[u8]) -> Result<Request, RequestError> {
        let mut parser = RequestParser::new(RequestLimits::default());
        let mut buf = BytesMut::from(data);
        match parser.receive(&mut buf)? {
            true => Ok(parser.take_request()),
            false => panic!("incomplete request in test input"),
        }
    }

    #[test]
    fn simple_get() {
        let r = parse_one(b"GET /hi HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(r.method(), Method::Get);
        assert_eq!(r.path(), "/hi");
        assert_eq!(r.protocol(), Protocol::Http11);
        assert_eq!(r.header("host"), Some("h"));
        assert!(r.body().is_empty());
        assert_eq!(r.content_length(), 0);
        assert!(r.is_loaded());
    }

    #[test]
    fn post_with_body() {
        let r =
            parse_one(b"POST /a HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\n\r\nabc").unwrap();
        assert_eq!(r.method(), Method::Post);
        assert_eq!(r.body(), b"abc");
        assert_eq!(r.content_length(), 3);
    }

    #[test]
    fn incremental_feed() {
        let mut parser = RequestParser::new(RequestLimits::default());
        let mut buf = BytesMut::new();
        for chunk in [
            &b"POST /a HT"[..],
            b"TP/1.1\r\nHost: h\r\nContent-Le",
            b"ngth: 5\r\n\r\nhe",
        ] {
            buf.extend_from_slice(chunk);
            assert!(!parser.receive(&mut buf).unwrap());
        }
        buf.extend_from_slice(b"llo");
        assert!(parser.receive(&mut buf).unwrap());
        assert_eq!(parser.take_request().body(), b"hello");
    }

    #[test]
    fn pipelined_leftover_stays_buffered() {
        let mut parser = RequestParser::new(RequestLimits::default());
        let mut buf = BytesMut::from(
            &b"POST /a HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\n\r\nabcGET /b HTTP/1.1\r\nHost: h\r\n\r\n"[..],
        );
        assert!(parser.receive(&mut buf).unwrap());
        let first = parser.take_request();
        assert_eq!(first.path(), "/a");
        assert_eq!(first.body(), b"abc");

        assert!(parser.receive(&mut buf).unwrap());
        let second = parser.take_request();
        assert_eq!(second.path(), "/b");
        assert!(second.body().is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn query_and_cookies() {
        let r = parse_one(
            b"GET /p%20q?a=1&b=hello+world&a=2 HTTP/1.1\r\nHost: h\r\nCookie: s=1; t=2\r\nCookie: t=3\r\n\r\n",
        )
        .unwrap();
        assert_eq!(r.path(), "/p q");
        assert_eq!(r.query("a"), Some("2"));
        assert_eq!(r.query("b"), Some("hello world"));
        assert_eq!(r.cookie("s"), Some("1"));
        assert_eq!(r.cookie("t"), Some("3"));
    }

    #[test]
    fn missing_host_on_http11() {
        let e = parse_one(b"GET / HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(e.status, 400);
    }

    #[test]
    fn http10_does_not_need_host() {
        let r = parse_one(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(r.protocol(), Protocol::Http10);
    }

    #[test]
    fn unknown_method_and_protocol() {
        assert_eq!(
            parse_one(b"BREW / HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err().status,
            405
        );
        assert_eq!(
            parse_one(b"GET / HTTP/2.0\r\nHost: h\r\n\r\n").unwrap_err().status,
            505
        );
        assert_eq!(
            parse_one(b"get / HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err().status,
            405
        );
    }

    #[test]
    fn conflicting_content_length_rejected() {
        let e = parse_one(
            b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\nContent-Length: 6\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(e.status, 400);
    }

    #[test]
    fn identical_duplicate_content_length_ok() {
        let r = parse_one(
            b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\nContent-Length: 2\r\n\r\nok",
        )
        .unwrap();
        assert_eq!(r.body(), b"ok");
    }

    #[test]
    fn transfer_encoding_rejected() {
        let e = parse_one(
            b"POST / HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(e.status, 501);
        // identity is the one allowed value
        let r = parse_one(
            b"POST / HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: identity\r\nContent-Length: 2\r\n\r\nok",
        )
        .unwrap();
        assert_eq!(r.body(), b"ok");
    }

    #[test]
    fn bad_content_length_values() {
        for bad in ["-1", "4.2", "1e3", "0x10", " ", "9999999999999999999999999"] {
            let req = format!(
                "POST / HTTP/1.1\r\nHost: h\r\nContent-Length: {}\r\n\r\n",
                bad
            );
            let e = parse_one(req.as_bytes()).unwrap_err();
            assert_eq!(e.status, 400, "value {:?}", bad);
        }
    }

    #[test]
    fn body_over_limit_is_413() {
        let limits = RequestLimits {
            max_content_length: 8,
            ..RequestLimits::default()
        };
        let mut parser = RequestParser::new(limits);
        let e = feed(
            &mut parser,
            b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 9\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(e.status, 413);
    }

    #[test]
    fn headers_over_limit_is_400() {
        let limits = RequestLimits {
            max_headers_length: 64,
            ..RequestLimits::default()
        };
        let mut parser = RequestParser::new(limits);
        let long = format!("GET / HTTP/1.1\r\nHost: h\r\nX-Pad: {}\r\n\r\n", "y".repeat(100));
        let e = feed(&mut parser, long.as_bytes()).unwrap_err();
        assert_eq!(e.status, 400);

        // an unterminated oversized line trips the budget too
        let mut parser = RequestParser::new(limits);
        let e = feed(&mut parser, &[b'A'; 100]).unwrap_err();
        assert_eq!(e.status, 400);
    }

    #[test]
    fn folding_rejected() {
        let e = parse_one(b"GET / HTTP/1.1\r\nHost: h\r\nX-A: 1\r\n folded\r\n\r\n").unwrap_err();
        assert_eq!(e.status, 400);
    }

    #[test]
    fn bad_percent_escape_in_path() {
        let e = parse_one(b"GET /a%zz HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(e.status, 400);
        // decoded path must be UTF-8
        let e = parse_one(b"GET /a%ff HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(e.status, 400);
    }

    #[test]
    fn bare_lf_only_in_lenient_mode() {
        let mut parser = RequestParser::new(RequestLimits::default());
        // no CRLF anywhere: strict mode never frames this
        assert!(!feed(&mut parser, b"GET / HTTP/1.1\nHost: h\n\n").unwrap());

        let limits = RequestLimits {
            lenient_eol: true,
            ..RequestLimits::default()
        };
        let mut parser = RequestParser::new(limits);
        assert!(feed(&mut parser, b"GET / HTTP/1.1\nHost: h\n\n").unwrap());
        assert_eq!(parser.take_request().header("host"), Some("h"));
    }

    #[test]
    fn duplicate_headers_last_wins() {
        let r = parse_one(b"GET / HTTP/1.1\r\nHost: h\r\nX-A: 1\r\nX-A: 2\r\n\r\n").unwrap();
        assert_eq!(r.header("x-a"), Some("2"));
    }

    #[test]
    fn leading_blank_lines_ignored() {
        let r = parse_one(b"\r\n\r\nGET / HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(r.path(), "/");
    }
}
