/*
 * encoder.rs
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

//! Response serialization into a connection's outbound buffer: plain,
//! redirect, file-stream head, and multipart framing.

use bytes::BytesMut;
use rand::Rng;

use super::response::Response;
use crate::wire::headers::canonical_name;
use crate::wire::status;

/// Framing headers the encoder always computes itself; caller copies are
/// dropped during emission.
const RESERVED: &[&str] = &["content-length", "connection"];

fn status_line(out: &mut BytesMut, code: u16) {
    out.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", code, status::message(code)).as_bytes());
}

fn header_line(out: &mut BytesMut, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

fn connection_line(out: &mut BytesMut, keep_alive: bool) {
    header_line(
        out,
        "Connection",
        if keep_alive { "keep-alive" } else { "close" },
    );
}

/// Serialize a plain response. Content-Type comes from the body variant
/// unless the caller set one; Content-Length is always computed from the
/// encoded body. HEAD responses keep the headers but drop the body bytes.
pub(crate) fn encode_response(
    out: &mut BytesMut,
    response: Response,
    keep_alive: bool,
    head_only: bool,
) {
    let derived_type = response.body.content_type();
    let body = response.body.into_bytes();

    status_line(out, response.status);
    match response.headers.get("content-type") {
        Some(ct) => header_line(out, "Content-Type", ct),
        None => header_line(out, "Content-Type", derived_type),
    }
    header_line(out, "Content-Length", &body.len().to_string());
    connection_line(out, keep_alive);
    for (name, value) in response.headers.iter() {
        if name == "content-type" || RESERVED.contains(&name) {
            continue;
        }
        header_line(out, &canonical_name(name), value);
    }
    for (name, value) in response.cookies.iter() {
        header_line(out, "Set-Cookie", &format!("{}={}", name, value));
    }
    out.extend_from_slice(b"\r\n");
    if !head_only {
        out.extend_from_slice(&body);
    }
}

/// The minimal canonical error response: plain text, forced close.
pub(crate) fn encode_error(out: &mut BytesMut, status_code: u16, message: &str) {
    status_line(out, status_code);
    header_line(out, "Content-Type", "text/plain");
    header_line(out, "Content-Length", &message.len().to_string());
    connection_line(out, false);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(message.as_bytes());
}

pub(crate) fn encode_redirect(out: &mut BytesMut, location: &str, code: u16, keep_alive: bool) {
    status_line(out, code);
    header_line(out, "Location", location);
    header_line(out, "Content-Length", "0");
    connection_line(out, keep_alive);
    out.extend_from_slice(b"\r\n");
}

/// Headers of a file-streaming response; the body follows from disk in
/// bounded chunks as the connection drains.
pub(crate) fn encode_file_head(
    out: &mut BytesMut,
    content_type: &str,
    length: u64,
    keep_alive: bool,
) {
    status_line(out, 200);
    header_line(out, "Content-Type", content_type);
    header_line(out, "Content-Length", &length.to_string());
    connection_line(out, keep_alive);
    out.extend_from_slice(b"\r\n");
}

/// Random boundary token for a multipart session.
pub(crate) fn make_boundary() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| {
            let n: u8 = rng.gen_range(0..16);
            char::from_digit(n as u32, 16).unwrap_or('0')
        })
        .collect()
}

/// Status and headers of a multipart/x-mixed-replace stream plus the
/// opening boundary marker. Multipart never recycles the connection.
pub(crate) fn encode_multipart_head(out: &mut BytesMut, code: u16, boundary: &str) {
    status_line(out, code);
    header_line(
        out,
        "Content-Type",
        &format!("multipart/x-mixed-replace; boundary={}", boundary),
    );
    connection_line(out, false);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
}

/// One frame: CRLF, frame headers, blank line, payload, CRLF and the next
/// boundary marker. Content-Length defaults to the payload size.
pub(crate) fn encode_multipart_frame(
    out: &mut BytesMut,
    boundary: &str,
    headers: &[(&str, &str)],
    payload: &[u8],
) {
    out.extend_from_slice(b"\r\n");
    let mut has_length = false;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-length") {
            has_length = true;
        }
        header_line(out, name, value);
    }
    if !has_length {
        header_line(out, "Content-Length", &payload.len().to_string());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n--");
    out.extend_from_slice(boundary.as_bytes());
}

/// Terminate the stream: the trailing `--` after the last boundary marker.
pub(crate) fn encode_multipart_end(out: &mut BytesMut) {
    out.extend_from_slice(b"--\r\n");
}
