//! Visits: the immutable ledger rows tying a subject to a room for one
//! presence session. A visit references exactly one timespan and is never
//! mutated after creation — exits close the timespan, not the visit.

use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, SubjectId, TimespanId, VisitId};
use crate::timespan::Timespan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    /// `YYYY-MM-DD` day the visit started on (UTC).
    pub day: String,
    pub subject_id: SubjectId,
    pub room_id: RoomId,
    pub timespan_id: TimespanId,
    pub created_at: String,
}

impl Visit {
    /// A visit is active iff its timespan is active. The timespan must be
    /// the one this visit references.
    pub fn is_active_at(&self, timespan: &Timespan, now: u64) -> bool {
        debug_assert_eq!(timespan.id, self.timespan_id);
        timespan.is_active_at(now)
    }
}
