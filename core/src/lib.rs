/*
 * lib.rs
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

//! Filigrana: a compact single-threaded HTTP/1.0 and HTTP/1.1 server and
//! client over non-blocking sockets.
//!
//! There are no threads, async runtimes, or callbacks. The engine exposes
//! ready-set accessors (`read_sockets`, `write_sockets`) and a progress
//! function (`process_events`); all blocking happens in the caller's
//! readiness primitive, or in the `wait` conveniences which poll(2) for
//! you. Designed to stay serviceable in memory-constrained environments:
//! bounded reads, explicit caps on headers and bodies, a single buffer per
//! direction per connection.
//!
//! Server:
//!
//! ```no_run
//! use filigrana_core::{Response, Server, ServerConfig};
//!
//! let mut server = Server::bind(ServerConfig::new("127.0.0.1", 8080)).unwrap();
//! loop {
//!     for (client, request) in server.wait(None).unwrap() {
//!         let _ = request.path();
//!         server.respond(client, Response::text("<p>hi</p>")).unwrap();
//!     }
//! }
//! ```
//!
//! Client:
//!
//! ```no_run
//! use std::time::Duration;
//! use filigrana_core::{Client, ClientRequest};
//!
//! let mut client = Client::new("http://127.0.0.1:8080").unwrap();
//! client.send(ClientRequest::get("/hi")).unwrap();
//! let response = client.wait(Some(Duration::from_secs(5))).unwrap();
//! ```
//!
//! TLS, name resolution policy, and JSON schema concerns live outside the
//! engine: a TLS provider implements `NetStream` plus the acceptor or
//! connector trait, and JSON rides on `serde_json::Value`.

pub mod client;
pub mod error;
pub mod h1;
pub mod net;
pub mod server;
pub mod timer;
pub mod wire;

pub use client::{Client, ClientConfig, ClientRequest, ClientResponse};
pub use error::{Error, Result};
pub use h1::{Method, Protocol};
pub use net::{NetStream, TlsAcceptor, TlsConnector};
pub use server::{ClientId, Request, Response, Server, ServerConfig};
pub use wire::body::Body;
pub use wire::cookie::Cookies;
pub use wire::headers::Headers;
