//! Bounded-or-open time intervals.
//!
//! A timespan is the unit of "how long a presence session lasted". It is
//! opened when a session begins and closed exactly once when it ends;
//! once a visit references it, it is never deleted.

use serde::{Deserialize, Serialize};

use crate::ids::TimespanId;
use crate::time::unix_to_iso8601;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timespan {
    pub id: TimespanId,
    /// Session start, Unix seconds.
    pub start: u64,
    /// Session end, Unix seconds. `None` while the session is open.
    pub end: Option<u64>,
    pub created_at: String,
}

impl Timespan {
    /// A timespan is active while it has no end, or an end in the future.
    pub fn is_active_at(&self, now: u64) -> bool {
        match self.end {
            None => true,
            Some(end) => end > now,
        }
    }

    /// Whether the end instant would be a valid close for this timespan.
    /// Invariant: `end >= start`.
    pub fn valid_end(&self, end: u64) -> bool {
        end >= self.start
    }

    pub fn start_iso8601(&self) -> String {
        unix_to_iso8601(self.start)
    }

    pub fn end_iso8601(&self) -> Option<String> {
        self.end.map(unix_to_iso8601)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: u64, end: Option<u64>) -> Timespan {
        Timespan {
            id: TimespanId(1),
            start,
            end,
            created_at: unix_to_iso8601(start),
        }
    }

    #[test]
    fn test_open_is_active() {
        assert!(span(100, None).is_active_at(100));
        assert!(span(100, None).is_active_at(1_000_000));
    }

    #[test]
    fn test_future_end_is_active() {
        assert!(span(100, Some(200)).is_active_at(150));
    }

    #[test]
    fn test_elapsed_end_is_inactive() {
        assert!(!span(100, Some(200)).is_active_at(200));
        assert!(!span(100, Some(200)).is_active_at(500));
    }

    #[test]
    fn test_valid_end() {
        let ts = span(100, None);
        assert!(ts.valid_end(100));
        assert!(ts.valid_end(101));
        assert!(!ts.valid_end(99));
    }
}
