//! Occupancy views: who is currently in a room, derived from active
//! visits. Pure result types — the aggregation queries live in the store.

use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub subject_id: SubjectId,
    pub name: String,
    /// ISO-8601 entry instant of the occupant's active visit.
    pub entered_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOccupancy {
    pub room_id: RoomId,
    pub room_name: String,
    pub capacity: Option<i64>,
    /// Ordered by entry time, earliest first.
    pub occupants: Vec<Occupant>,
}

impl RoomOccupancy {
    pub fn count(&self) -> usize {
        self.occupants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        let occ = RoomOccupancy {
            room_id: RoomId(101),
            room_name: "Room 101".to_string(),
            capacity: Some(25),
            occupants: vec![
                Occupant {
                    subject_id: SubjectId(1),
                    name: "a".to_string(),
                    entered_at: "2026-02-21T08:00:00Z".to_string(),
                },
                Occupant {
                    subject_id: SubjectId(2),
                    name: "b".to_string(),
                    entered_at: "2026-02-21T08:05:00Z".to_string(),
                },
            ],
        };
        assert_eq!(occ.count(), 2);
    }
}
