/*
 * headers.rs
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

//! Header mapping plus header-line and header-parameter splitting.
//!
//! `Headers` is case-insensitive and insertion-ordered; names are stored
//! lowercase and repeated `set` calls are last-wins. `Set-Cookie` emission
//! is handled by the response encoder, one line per cookie, so the mapping
//! itself never needs multi-value entries.

use std::collections::HashMap;

use super::Malformed;

/// Case-insensitive, insertion-ordered header mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace. The name is stored lowercase; a later `set` of the
    /// same name wins.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical casing for header emission: `content-type` to `Content-Type`.
pub(crate) fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, segment) in name.split('-').enumerate() {
        if i > 0 {
            out.push('-');
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Split one `Name: value` line on the first colon. The name is trimmed and
/// lowercased, the value trimmed. Empty name or missing colon is malformed.
pub fn split_header_line(line: &str) -> Result<(String, String), Malformed> {
    let colon = line.find(':').ok_or(Malformed("header line without colon"))?;
    let name = line[..colon].trim();
    if name.is_empty() {
        return Err(Malformed("header line with empty name"));
    }
    let value = line[colon + 1..].trim();
    Ok((name.to_ascii_lowercase(), value.to_string()))
}

/// Split a parameterized header value such as
/// `text/html; charset=utf-8; boundary="x"`. The leading token (no `=`) is
/// stored under the empty key; parameter names are lowercased and
/// quoted-string values have the surrounding quotes stripped.
pub fn split_parameters(value: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (i, part) in value.split(';').enumerate() {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.find('=') {
            Some(eq) => {
                let name = part[..eq].trim().to_ascii_lowercase();
                let mut v = part[eq + 1..].trim();
                if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
                    v = &v[1..v.len() - 1];
                }
                out.insert(name, v.to_string());
            }
            None if i == 0 => {
                out.insert(String::new(), part.to_string());
            }
            None => {
                out.insert(part.to_ascii_lowercase(), String::new());
            }
        }
    }
    out
}
