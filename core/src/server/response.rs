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

//! Outgoing response builder. Add headers and cookies, then hand it to
//! `Server::respond`. Content-Type is derived from the body variant unless
//! set explicitly; Content-Length and Connection are always computed by the
//! encoder.

use serde_json::Value;

use crate::wire::body::Body;
use crate::wire::cookie::Cookies;
use crate::wire::headers::Headers;

#[derive(Debug, Clone)]
pub struct Response {
    pub(crate) status: u16,
    pub(crate) headers: Headers,
    pub(crate) cookies: Cookies,
    pub(crate) body: Body,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            cookies: Cookies::new(),
            body: Body::Empty,
        }
    }

    /// 200 with an HTML text body.
    pub fn text(text: impl Into<String>) -> Self {
        let mut r = Self::new(200);
        r.body = Body::Text(text.into());
        r
    }

    /// 200 with a JSON body.
    pub fn json(value: Value) -> Self {
        let mut r = Self::new(200);
        r.body = Body::Json(value);
        r
    }

    /// 200 with an opaque byte body.
    pub fn bytes(data: Vec<u8>) -> Self {
        let mut r = Self::new(200);
        r.body = Body::Bytes(data);
        r
    }

    /// Status only, empty body.
    pub fn empty(status: u16) -> Self {
        Self::new(status)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_body(&mut self, body: Body) -> &mut Self {
        self.body = body;
        self
    }

    /// Add or replace a header. Content-Length and Connection are owned by
    /// the encoder and ignored here at emission time.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    /// Add a Set-Cookie (bare name=value, no attributes).
    pub fn cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.set(name, value);
        self
    }
}
