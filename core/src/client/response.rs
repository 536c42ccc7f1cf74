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

//! A decoded response as returned by `Client::wait`. The JSON view is a
//! lazy, memoized decode of the body.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::h1::Protocol;
use crate::wire::cookie::Cookies;
use crate::wire::headers::Headers;

#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub(crate) status: u16,
    pub(crate) reason: String,
    pub(crate) protocol: Protocol,
    pub(crate) headers: Headers,
    /// Cookies delivered via Set-Cookie on this response.
    pub(crate) cookies: Cookies,
    pub(crate) body: Vec<u8>,
    json: Option<Value>,
}

impl ClientResponse {
    pub(crate) fn empty() -> Self {
        Self {
            status: 0,
            reason: String::new(),
            protocol: Protocol::Http11,
            headers: Headers::new(),
            cookies: Cookies::new(),
            body: Vec::new(),
            json: None,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Cookie set by this response, attributes stripped.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON; the result is memoized.
    pub fn json(&mut self) -> Result<&Value> {
        if self.json.is_none() {
            let value: Value = serde_json::from_slice(&self.body)
                .map_err(|e| Error::response(format!("invalid JSON body: {}", e)))?;
            self.json = Some(value);
        }
        Ok(self.json.as_ref().expect("just set"))
    }
}
