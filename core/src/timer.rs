/*
 * timer.rs
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

//! Absolute deadlines. All timeouts are computed at entry and checked only
//! at readiness boundaries; there is no background timer thread.

use std::time::{Duration, Instant};

/// A point in monotonic time after which an operation has timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `duration` from now.
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.0
    }

    /// Time left until the deadline; zero once it has passed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.0.saturating_duration_since(now)
    }
}

/// The smaller remaining duration of an optional deadline and an optional
/// budget. `None` means unbounded.
pub fn min_remaining(deadline: Option<Deadline>, budget: Option<Duration>) -> Option<Duration> {
    let now = Instant::now();
    match (deadline.map(|d| d.remaining(now)), budget) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry() {
        let d = Deadline::after(Duration::from_millis(50));
        let now = Instant::now();
        assert!(!d.expired(now));
        assert!(d.expired(now + Duration::from_millis(60)));
        assert_eq!(d.remaining(now + Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn min_remaining_picks_smaller() {
        let d = Deadline::after(Duration::from_secs(10));
        let t = min_remaining(Some(d), Some(Duration::from_millis(5)));
        assert!(t.unwrap() <= Duration::from_millis(5));
        assert!(min_remaining(None, None).is_none());
    }
}
