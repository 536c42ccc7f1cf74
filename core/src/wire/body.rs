/*
 * body.rs
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

//! Tagged response payload. Each variant carries its derived content type;
//! the encoder sets `Content-Length` from the encoded bytes.

use serde_json::Value;

/// Payload of an outgoing message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    Empty,
}

impl Body {
    /// Derived content type for the variant.
    pub fn content_type(&self) -> &'static str {
        match self {
            Body::Json(_) => "application/json",
            Body::Text(_) => "text/html; charset=utf-8",
            Body::Bytes(_) => "application/octet-stream",
            Body::Empty => "text/plain",
        }
    }

    /// Encode into wire bytes. JSON serialization of a `Value` cannot fail.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Body::Json(v) => v.to_string().into_bytes(),
            Body::Text(s) => s.into_bytes(),
            Body::Bytes(b) => b,
            Body::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Json(_) => false,
            Body::Text(s) => s.is_empty(),
            Body::Bytes(b) => b.is_empty(),
            Body::Empty => true,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(b)
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Json(v)
    }
}
