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

//! An incoming request, built incrementally by the request parser and handed
//! to the application once fully framed. After that point it is immutable:
//! `content_length() == body().len()` and `is_loaded()` holds.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::h1::{Method, Protocol};
use crate::wire::cookie::Cookies;
use crate::wire::headers::Headers;

/// A fully framed request as surfaced by `Server::process_events`.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) protocol: Protocol,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, String>,
    pub(crate) headers: Headers,
    pub(crate) cookies: Cookies,
    pub(crate) body: Vec<u8>,
    pub(crate) content_length: usize,
    pub(crate) loaded: bool,
}

impl Request {
    pub(crate) fn empty() -> Self {
        Self {
            method: Method::Get,
            url: String::new(),
            protocol: Protocol::Http11,
            path: String::new(),
            query: HashMap::new(),
            headers: Headers::new(),
            cookies: Cookies::new(),
            body: Vec::new(),
            content_length: 0,
            loaded: false,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Request target exactly as received, before percent decoding.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Percent-decoded path, query stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query value by name; repeated names are last-wins.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Header value, case-insensitive; names are stored lowercase.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name)
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::response(format!("invalid JSON body: {}", e)))
    }
}
