/*
 * digest.rs
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

//! Digest access authentication (RFC 7616), MD5 and MD5-sess with
//! `qop=auth`. The session keeps the server nonce and the nonce counter;
//! the counter resets whenever the nonce changes (including `stale=true`
//! re-challenges).

use md5::{Digest, Md5};
use rand::Rng;

use crate::h1::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Md5,
    Md5Sess,
}

impl Algorithm {
    fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
        }
    }
}

/// A parsed WWW-Authenticate Digest challenge.
#[derive(Debug, Clone)]
pub(crate) struct Challenge {
    pub realm: String,
    pub nonce: String,
    /// `Some("auth")` when the server offers a qop we support.
    pub qop: Option<String>,
    pub algorithm: Algorithm,
    pub opaque: Option<String>,
    pub stale: bool,
}

/// Parse a `WWW-Authenticate: Digest ...` value. Returns None when the
/// scheme is not Digest or the challenge is unusable (missing fields,
/// unsupported algorithm, qop offered without `auth`).
pub(crate) fn parse_challenge(value: &str) -> Option<Challenge> {
    let trimmed = value.trim();
    let scheme_end = trimmed.find(char::is_whitespace)?;
    if !trimmed[..scheme_end].eq_ignore_ascii_case("digest") {
        return None;
    }
    let params = split_challenge_params(&trimmed[scheme_end..]);
    let get = |name: &str| {
        params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };

    let realm = get("realm")?;
    let nonce = get("nonce")?;
    let algorithm = match get("algorithm") {
        None => Algorithm::Md5,
        Some(a) if a.eq_ignore_ascii_case("MD5") => Algorithm::Md5,
        Some(a) if a.eq_ignore_ascii_case("MD5-sess") => Algorithm::Md5Sess,
        Some(_) => return None,
    };
    let qop = match get("qop") {
        None => None,
        Some(offered) => {
            if offered
                .split(',')
                .any(|t| t.trim().eq_ignore_ascii_case("auth"))
            {
                Some("auth".to_string())
            } else {
                return None;
            }
        }
    };
    let stale = get("stale").map(|s| s.eq_ignore_ascii_case("true")).unwrap_or(false);

    Some(Challenge {
        realm,
        nonce,
        qop,
        algorithm,
        opaque: get("opaque"),
        stale,
    })
}

/// Split `k=v, k="v w", k` parameters; commas inside quoted strings do not
/// separate. Names are lowercased, quotes stripped.
fn split_challenge_params(input: &str) -> Vec<(String, String)> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        while pos < bytes.len() && (bytes[pos] == b',' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        let key_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && bytes[pos] != b',' {
            pos += 1;
        }
        let key = input[key_start..pos].trim().to_ascii_lowercase();
        let mut value = String::new();
        if pos < bytes.len() && bytes[pos] == b'=' {
            pos += 1;
            if pos < bytes.len() && bytes[pos] == b'"' {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != b'"' {
                    if bytes[pos] == b'\\' && pos + 1 < bytes.len() {
                        value.push(bytes[pos + 1] as char);
                        pos += 2;
                    } else {
                        value.push(bytes[pos] as char);
                        pos += 1;
                    }
                }
                pos += 1; // closing quote
            } else {
                let val_start = pos;
                while pos < bytes.len() && bytes[pos] != b',' {
                    pos += 1;
                }
                value = input[val_start..pos].trim().to_string();
            }
        }
        if !key.is_empty() {
            out.push((key, value));
        }
    }
    out
}

/// Session state carried across authenticated requests to one server.
#[derive(Debug, Clone)]
pub(crate) struct DigestSession {
    realm: String,
    nonce: String,
    qop: Option<String>,
    algorithm: Algorithm,
    opaque: Option<String>,
    nc: u32,
}

impl DigestSession {
    pub fn new(challenge: Challenge) -> Self {
        Self {
            realm: challenge.realm,
            nonce: challenge.nonce,
            qop: challenge.qop,
            algorithm: challenge.algorithm,
            opaque: challenge.opaque,
            nc: 0,
        }
    }

    /// Adopt a fresh challenge (new nonce, e.g. stale=true); the nonce
    /// counter starts over.
    pub fn rekey(&mut self, challenge: Challenge) {
        *self = Self::new(challenge);
    }

    /// Build an Authorization header value for one request, advancing the
    /// nonce counter.
    pub fn authorization(
        &mut self,
        username: &str,
        password: &str,
        method: Method,
        uri: &str,
    ) -> String {
        self.nc += 1;
        let nc_hex = format!("{:08x}", self.nc);
        let cnonce = make_cnonce();
        let response = compute_response(
            self.algorithm,
            username,
            &self.realm,
            password,
            method,
            uri,
            &self.nonce,
            self.qop.as_deref(),
            &nc_hex,
            &cnonce,
        );

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}",
            username,
            self.realm,
            self.nonce,
            uri,
            self.algorithm.as_str()
        );
        if let Some(qop) = &self.qop {
            header.push_str(&format!(", qop={}, nc={}, cnonce=\"{}\"", qop, nc_hex, cnonce));
        }
        header.push_str(&format!(", response=\"{}\"", response));
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        header
    }

    #[cfg(test)]
    pub fn nonce_count(&self) -> u32 {
        self.nc
    }
}

/// The digest response hash per RFC 7616 §3.4.1.
fn compute_response(
    algorithm: Algorithm,
    username: &str,
    realm: &str,
    password: &str,
    method: Method,
    uri: &str,
    nonce: &str,
    qop: Option<&str>,
    nc_hex: &str,
    cnonce: &str,
) -> String {
    let mut ha1 = md5_hex(format!("{}:{}:{}", username, realm, password).as_bytes());
    if algorithm == Algorithm::Md5Sess {
        ha1 = md5_hex(format!("{}:{}:{}", ha1, nonce, cnonce).as_bytes());
    }
    let ha2 = md5_hex(format!("{}:{}", method.as_str(), uri).as_bytes());
    match qop {
        Some(qop) => md5_hex(
            format!("{}:{}:{}:{}:{}:{}", ha1, nonce, nc_hex, cnonce, qop, ha2).as_bytes(),
        ),
        None => md5_hex(format!("{}:{}:{}", ha1, nonce, ha2).as_bytes()),
    }
}

fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Random 16-hex-digit client nonce.
fn make_cnonce() -> String {
    let mut rng = rand::thread_rng();
    let n: u64 = rng.gen();
    format!("{:016x}", n)
}
