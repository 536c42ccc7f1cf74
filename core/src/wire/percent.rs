/*
 * percent.rs
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

//! Percent-coding. Encoding uses the percent-encoding crate; decoding is
//! strict: a lone `%` or a non-hex pair is a malformed-input error, never a
//! lossy passthrough. `+` is not touched here; query parsing maps `+` to
//! space before calling decode.

use percent_encoding::{percent_encode, AsciiSet, CONTROLS};

use super::Malformed;

/// Component set: everything a query name or value must escape.
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'=')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode arbitrary bytes for use as a query component.
pub fn encode(input: &[u8]) -> String {
    percent_encode(input, COMPONENT).to_string()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `%HH` sequences into raw bytes.
pub fn decode(input: &str) -> Result<Vec<u8>, Malformed> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            match (hi, lo) {
                (Some(h), Some(l)) => {
                    out.push(h << 4 | l);
                    i += 3;
                }
                _ => return Err(Malformed("invalid percent escape")),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Decode `%HH` sequences and require the result to be UTF-8.
pub fn decode_utf8(input: &str) -> Result<String, Malformed> {
    let bytes = decode(input)?;
    String::from_utf8(bytes).map_err(|_| Malformed("percent-decoded data is not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_basic() {
        assert_eq!(decode("a%20b").unwrap(), b"a b");
        assert_eq!(decode("%2F%2f").unwrap(), b"//");
        assert_eq!(decode("plain").unwrap(), b"plain");
        assert_eq!(decode("").unwrap(), b"");
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(decode("%").is_err());
        assert!(decode("%2").is_err());
        assert!(decode("%zz").is_err());
        assert!(decode("a%0gb").is_err());
    }

    #[test]
    fn plus_is_not_space() {
        assert_eq!(decode("a+b").unwrap(), b"a+b");
    }

    #[test]
    fn decode_inverts_encode() {
        // all single bytes, plus a mixed sequence
        for b in 0u8..=255 {
            let enc = encode(&[b]);
            assert_eq!(decode(&enc).unwrap(), vec![b], "byte {:#x}", b);
        }
        let data = b"a b&c=d%e\xff\x00/?";
        assert_eq!(decode(&encode(data)).unwrap(), data);
    }

    #[test]
    fn decode_utf8_rejects_bad_sequences() {
        assert!(decode_utf8("%ff%fe").is_err());
        assert_eq!(decode_utf8("%c3%a9").unwrap(), "é");
    }
}
