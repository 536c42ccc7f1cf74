/*
 * query.rs
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

//! Query-string parsing and serialization. Parts split on `&`, each part on
//! the first `=` (value defaults to empty); names and values get `+` mapped
//! to space and are then percent-decoded. Repeated names are last-wins.

use std::collections::HashMap;

use super::percent;
use super::Malformed;

/// Parse `raw` and merge the pairs into `into`, later occurrences winning.
pub fn parse_into(raw: &str, into: &mut HashMap<String, String>) -> Result<(), Malformed> {
    for part in raw.split('&') {
        if part.is_empty() {
            continue;
        }
        let (name, value) = match part.find('=') {
            Some(eq) => (&part[..eq], &part[eq + 1..]),
            None => (part, ""),
        };
        let name = percent::decode_utf8(&name.replace('+', " "))?;
        let value = percent::decode_utf8(&value.replace('+', " "))?;
        into.insert(name, value);
    }
    Ok(())
}

/// Serialize pairs for a request target; empty input yields an empty string,
/// otherwise a leading `?` is included.
pub fn serialize(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut out = String::from("?");
    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(&percent::encode(name.as_bytes()));
        if !value.is_empty() {
            out.push('=');
            out.push_str(&percent::encode(value.as_bytes()));
        }
    }
    out
}
