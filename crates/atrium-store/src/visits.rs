//! The visit ledger: immutable rows recording which subject was in which
//! room for which timespan.
//!
//! Entries and exits are each one transaction. An entry may find stale
//! open visits for the subject (a missed prior exit); those are closed
//! with a data-integrity warning rather than failing the scan, keeping
//! the invariant of at most one open visit per subject.

use rusqlite::{Connection, params};

use atrium_core::time::{day_from_unix, now_iso8601};
use atrium_core::{RoomId, SubjectId, Timespan, TimespanId, Visit, VisitId};

use crate::error::Result;
use crate::store::Store;
use crate::timespans::{close_timespan_on, open_timespan_on, row_to_timespan};

impl Store {
    /// Record a subject entering a room at `now`: closes any stale open
    /// visit for the subject, opens a fresh timespan and appends the
    /// ledger row — all in one transaction.
    pub fn record_room_entry(&self, subject_id: SubjectId, room_id: RoomId, now: u64) -> Result<Visit> {
        // cheap existence checks for precise errors before writing
        self.room(room_id)?;
        self.subject(subject_id)?;

        let tx = self.conn().unchecked_transaction()?;

        let stale = open_timespan_ids(&tx, subject_id, None)?;
        if !stale.is_empty() {
            tracing::warn!(
                subject_id = subject_id.0,
                stale = stale.len(),
                "entry found open visit(s) for subject; closing (missed exit?)"
            );
            for ts_id in &stale {
                close_timespan_on(&tx, *ts_id, now)?;
            }
        }

        let span = open_timespan_on(&tx, now)?;
        let day = day_from_unix(now);
        let created_at = now_iso8601();
        tx.execute(
            "INSERT INTO visits (day, subject_id, room_id, timespan_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![day, subject_id.0, room_id.0, span.id.0, created_at],
        )?;
        let visit = Visit {
            id: VisitId(tx.last_insert_rowid()),
            day,
            subject_id,
            room_id,
            timespan_id: span.id,
            created_at,
        };

        tx.commit()?;
        Ok(visit)
    }

    /// Exit protocol: close every open visit matching `(subject, room)`.
    /// More than one match indicates a missed prior exit — all are closed
    /// and a warning is logged, the caller's request still succeeds.
    /// Returns the number of timespans closed (possibly zero).
    pub fn record_room_exit(&self, subject_id: SubjectId, room_id: RoomId, now: u64) -> Result<usize> {
        self.room(room_id)?;
        self.subject(subject_id)?;

        let tx = self.conn().unchecked_transaction()?;

        let open = open_timespan_ids(&tx, subject_id, Some(room_id))?;
        if open.len() > 1 {
            tracing::warn!(
                subject_id = subject_id.0,
                room_id = room_id.0,
                open = open.len(),
                "multiple open visits for subject in room; closing all"
            );
        }
        for ts_id in &open {
            close_timespan_on(&tx, *ts_id, now)?;
        }

        tx.commit()?;
        Ok(open.len())
    }

    /// Ledger rows for one subject, most recent first, optionally
    /// restricted to one `YYYY-MM-DD` day.
    pub fn visits_by_subject(
        &self,
        subject_id: SubjectId,
        day: Option<&str>,
    ) -> Result<Vec<(Visit, Timespan)>> {
        let mut stmt = self.conn().prepare(
            "SELECT v.id, v.day, v.subject_id, v.room_id, v.timespan_id, v.created_at,
                    t.id, t.start_secs, t.end_secs, t.created_at
             FROM visits v JOIN timespans t ON t.id = v.timespan_id
             WHERE v.subject_id = ?1 AND (?2 IS NULL OR v.day = ?2)
             ORDER BY v.id DESC",
        )?;
        let rows = stmt
            .query_map(params![subject_id.0, day], row_to_visit_pair)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Ledger rows for one room, most recent first. `active_only` keeps
    /// only visits whose timespan is still active at `now`.
    pub fn visits_by_room(
        &self,
        room_id: RoomId,
        day: Option<&str>,
        active_only: bool,
        now: u64,
    ) -> Result<Vec<(Visit, Timespan)>> {
        let mut stmt = self.conn().prepare(
            "SELECT v.id, v.day, v.subject_id, v.room_id, v.timespan_id, v.created_at,
                    t.id, t.start_secs, t.end_secs, t.created_at
             FROM visits v JOIN timespans t ON t.id = v.timespan_id
             WHERE v.room_id = ?1 AND (?2 IS NULL OR v.day = ?2)
               AND (?3 = 0 OR t.end_secs IS NULL OR t.end_secs > ?4)
             ORDER BY v.id DESC",
        )?;
        let rows = stmt
            .query_map(
                params![room_id.0, day, active_only as i64, now as i64],
                row_to_visit_pair,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Timespan ids of the subject's open (`end IS NULL`) visits, optionally
/// restricted to one room.
fn open_timespan_ids(
    conn: &Connection,
    subject_id: SubjectId,
    room_id: Option<RoomId>,
) -> Result<Vec<TimespanId>> {
    let mut stmt = conn.prepare(
        "SELECT t.id FROM visits v JOIN timespans t ON t.id = v.timespan_id
         WHERE v.subject_id = ?1 AND (?2 IS NULL OR v.room_id = ?2)
           AND t.end_secs IS NULL
         ORDER BY t.id",
    )?;
    let ids = stmt
        .query_map(params![subject_id.0, room_id.map(|r| r.0)], |row| {
            Ok(TimespanId(row.get(0)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn row_to_visit_pair(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Visit, Timespan)> {
    let visit = Visit {
        id: VisitId(row.get(0)?),
        day: row.get(1)?,
        subject_id: SubjectId(row.get(2)?),
        room_id: RoomId(row.get(3)?),
        timespan_id: TimespanId(row.get(4)?),
        created_at: row.get(5)?,
    };
    let span = Timespan {
        id: TimespanId(row.get(6)?),
        start: row.get::<_, i64>(7)? as u64,
        end: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        created_at: row.get(9)?,
    };
    Ok((visit, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn seeded() -> (Store, SubjectId, RoomId) {
        let store = Store::open_in_memory().unwrap();
        let subject = store.add_subject("Alva", Some("STUDENT0001")).unwrap();
        let room = store.add_room("101", Some(25)).unwrap();
        (store, subject, room)
    }

    #[test]
    fn test_entry_creates_open_visit() {
        let (store, subject, room) = seeded();

        let visit = store.record_room_entry(subject, room, 1000).unwrap();
        assert_eq!(visit.subject_id, subject);
        assert_eq!(visit.room_id, room);
        assert_eq!(visit.day, day_from_unix(1000));

        let span = store.timespan(visit.timespan_id).unwrap();
        assert_eq!(span.start, 1000);
        assert!(span.end.is_none());
    }

    #[test]
    fn test_exit_closes_matching_visit() {
        let (store, subject, room) = seeded();
        let visit = store.record_room_entry(subject, room, 1000).unwrap();

        let closed = store.record_room_exit(subject, room, 1800).unwrap();
        assert_eq!(closed, 1);

        let span = store.timespan(visit.timespan_id).unwrap();
        assert_eq!(span.end, Some(1800));
        assert!(span.end.unwrap() >= span.start);

        // the visit row itself is untouched
        let visits = store.visits_by_subject(subject, None).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].0, visit);
    }

    #[test]
    fn test_exit_without_open_visit_closes_nothing() {
        let (store, subject, room) = seeded();
        assert_eq!(store.record_room_exit(subject, room, 500).unwrap(), 0);
    }

    #[test]
    fn test_exit_in_other_room_does_not_close() {
        let (store, subject, room) = seeded();
        let other = store.add_room("102", None).unwrap();
        let visit = store.record_room_entry(subject, room, 1000).unwrap();

        assert_eq!(store.record_room_exit(subject, other, 1500).unwrap(), 0);
        assert!(store.timespan(visit.timespan_id).unwrap().end.is_none());
    }

    #[test]
    fn test_entry_closes_stale_open_visit_anywhere() {
        let (store, subject, room) = seeded();
        let other = store.add_room("102", None).unwrap();

        // missed exit in room 101, then an entry in 102
        let stale = store.record_room_entry(subject, room, 1000).unwrap();
        let fresh = store.record_room_entry(subject, other, 2000).unwrap();

        assert_eq!(store.timespan(stale.timespan_id).unwrap().end, Some(2000));
        assert!(store.timespan(fresh.timespan_id).unwrap().end.is_none());

        // at most one open visit per subject
        let open: Vec<_> = store
            .visits_by_subject(subject, None)
            .unwrap()
            .into_iter()
            .filter(|(_, t)| t.end.is_none())
            .collect();
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn test_entry_unknown_room_rejected() {
        let (store, subject, _) = seeded();
        let err = store.record_room_entry(subject, RoomId(999), 100).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "room", .. }));
    }

    #[test]
    fn test_visits_by_subject_most_recent_first() {
        let (store, subject, room) = seeded();
        let first = store.record_room_entry(subject, room, 1000).unwrap();
        store.record_room_exit(subject, room, 1100).unwrap();
        let second = store.record_room_entry(subject, room, 1200).unwrap();

        let visits = store.visits_by_subject(subject, None).unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].0.id, second.id);
        assert_eq!(visits[1].0.id, first.id);
    }

    #[test]
    fn test_visits_by_subject_day_filter() {
        let (store, subject, room) = seeded();
        let day1 = 86400; // 1970-01-02
        let day2 = 2 * 86400; // 1970-01-03
        store.record_room_entry(subject, room, day1).unwrap();
        store.record_room_exit(subject, room, day1 + 100).unwrap();
        store.record_room_entry(subject, room, day2).unwrap();

        let visits = store.visits_by_subject(subject, Some("1970-01-02")).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].0.day, "1970-01-02");
    }

    #[test]
    fn test_visits_by_room_active_only() {
        let (store, subject, room) = seeded();
        let other = store.add_subject("Bo", None).unwrap();

        store.record_room_entry(subject, room, 1000).unwrap();
        store.record_room_exit(subject, room, 1100).unwrap();
        store.record_room_entry(other, room, 1050).unwrap();

        let all = store.visits_by_room(room, None, false, 2000).unwrap();
        assert_eq!(all.len(), 2);

        let active = store.visits_by_room(room, None, true, 2000).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0.subject_id, other);
    }
}
