/*
 * poll.rs
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

//! poll(2)-based readiness for the blocking `wait` conveniences. Callers
//! running their own multiplexer never need this; they feed ready sets to
//! `process_events` directly.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// File descriptors that are ready for reading or writing.
#[derive(Debug, Default)]
pub struct Readiness {
    pub readable: Vec<RawFd>,
    pub writable: Vec<RawFd>,
}

impl Readiness {
    pub fn is_empty(&self) -> bool {
        self.readable.is_empty() && self.writable.is_empty()
    }
}

/// Block until one of the descriptors is ready or the timeout elapses.
/// `None` blocks indefinitely. EINTR yields an empty set.
pub fn wait_readiness(
    read_fds: &[RawFd],
    write_fds: &[RawFd],
    timeout: Option<Duration>,
) -> io::Result<Readiness> {
    let mut fds: Vec<libc::pollfd> = Vec::with_capacity(read_fds.len() + write_fds.len());
    for &fd in read_fds {
        fds.push(libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        });
    }
    for &fd in write_fds {
        match fds.iter_mut().find(|p| p.fd == fd) {
            Some(p) => p.events |= libc::POLLOUT,
            None => fds.push(libc::pollfd {
                fd,
                events: libc::POLLOUT,
                revents: 0,
            }),
        }
    }

    let timeout_ms: libc::c_int = match timeout {
        Some(t) => {
            // round up so sub-millisecond remainders do not busy-loop
            let mut ms = t.as_millis().min(i32::MAX as u128) as u64;
            if Duration::from_millis(ms) < t {
                ms += 1;
            }
            ms.min(i32::MAX as u64) as libc::c_int
        }
        None => -1,
    };

    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Readiness::default());
        }
        return Err(err);
    }

    let mut out = Readiness::default();
    for p in &fds {
        if p.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
            out.readable.push(p.fd);
        }
        if p.revents & (libc::POLLOUT | libc::POLLERR) != 0 {
            out.writable.push(p.fd);
        }
    }
    Ok(out)
}
