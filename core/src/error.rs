/*
 * error.rs
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

//! Engine errors as surfaced to callers.
//!
//! Server-side parse failures never appear here: the server converts them
//! into exactly one canned response and closes the connection.

use std::fmt;
use std::io;

/// Errors reported by the client and by server respond operations.
#[derive(Debug)]
pub enum Error {
    /// Transport failure: connect refused, reset, unexpected close.
    Connection(String),
    /// A hard deadline fired; the affected connection has been closed.
    Timeout,
    /// The peer sent something syntactically or semantically invalid.
    Response(String),
    /// A configured size cap was exceeded while decoding a response.
    TooLarge(&'static str),
    /// API misuse: operation not valid in the current connection state.
    State(&'static str),
    /// Operating-system error outside the categories above.
    Io(io::Error),
}

impl Error {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn response(msg: impl Into<String>) -> Self {
        Self::Response(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(m) => write!(f, "connection error: {}", m),
            Error::Timeout => write!(f, "timed out"),
            Error::Response(m) => write!(f, "protocol error: {}", m),
            Error::TooLarge(what) => write!(f, "{} exceeds configured limit", what),
            Error::State(m) => write!(f, "invalid state: {}", m),
            Error::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
