//! Timespan lifecycle: open once, close exactly once.
//!
//! The close is a guarded UPDATE (`WHERE end_secs IS NULL`), so when a
//! concurrent entry and exit race on the same open timespan, at most one
//! close can win; the loser sees `Conflict` instead of silently
//! overwriting a historical end time.

use rusqlite::{Connection, OptionalExtension, params};

use atrium_core::time::now_iso8601;
use atrium_core::{Timespan, TimespanId};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    pub fn open_timespan(&self, start: u64) -> Result<Timespan> {
        open_timespan_on(self.conn(), start)
    }

    /// Close an open timespan. Errors: `NotFound` for an unknown id,
    /// `Conflict` when already closed, `Validation` when `end < start`.
    pub fn close_timespan(&self, id: TimespanId, end: u64) -> Result<()> {
        close_timespan_on(self.conn(), id, end)
    }

    pub fn timespan(&self, id: TimespanId) -> Result<Timespan> {
        self.conn()
            .query_row(
                "SELECT id, start_secs, end_secs, created_at FROM timespans WHERE id = ?1",
                [id.0],
                row_to_timespan,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: "timespan",
                id: id.0,
            })
    }
}

/// Transaction-friendly variant: runs on whatever connection/transaction
/// the caller holds.
pub(crate) fn open_timespan_on(conn: &Connection, start: u64) -> Result<Timespan> {
    let created_at = now_iso8601();
    conn.execute(
        "INSERT INTO timespans (start_secs, end_secs, created_at) VALUES (?1, NULL, ?2)",
        params![start as i64, created_at],
    )?;
    Ok(Timespan {
        id: TimespanId(conn.last_insert_rowid()),
        start,
        end: None,
        created_at,
    })
}

pub(crate) fn close_timespan_on(conn: &Connection, id: TimespanId, end: u64) -> Result<()> {
    let span = conn
        .query_row(
            "SELECT id, start_secs, end_secs, created_at FROM timespans WHERE id = ?1",
            [id.0],
            row_to_timespan,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            kind: "timespan",
            id: id.0,
        })?;

    if !span.valid_end(end) {
        return Err(StoreError::Validation(format!(
            "end {end} precedes start {} of timespan {id}",
            span.start
        )));
    }

    let updated = conn.execute(
        "UPDATE timespans SET end_secs = ?1 WHERE id = ?2 AND end_secs IS NULL",
        params![end as i64, id.0],
    )?;
    if updated == 0 {
        // Guard failed: another close won the race, or it was closed before.
        return Err(StoreError::Conflict(format!("timespan {id} already closed")));
    }
    Ok(())
}

pub(crate) fn row_to_timespan(row: &rusqlite::Row<'_>) -> rusqlite::Result<Timespan> {
    Ok(Timespan {
        id: TimespanId(row.get(0)?),
        start: row.get::<_, i64>(1)? as u64,
        end: row.get::<_, Option<i64>>(2)?.map(|v| v as u64),
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_close() {
        let store = Store::open_in_memory().unwrap();
        let span = store.open_timespan(1000).unwrap();
        assert!(span.end.is_none());
        assert!(span.is_active_at(5000));

        store.close_timespan(span.id, 1500).unwrap();
        let closed = store.timespan(span.id).unwrap();
        assert_eq!(closed.end, Some(1500));
        assert!(!closed.is_active_at(5000));
    }

    #[test]
    fn test_close_unknown_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.close_timespan(TimespanId(77), 100).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "timespan", .. }));
    }

    #[test]
    fn test_double_close_rejected() {
        let store = Store::open_in_memory().unwrap();
        let span = store.open_timespan(1000).unwrap();
        store.close_timespan(span.id, 1500).unwrap();

        let err = store.close_timespan(span.id, 2000).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // the first end time survives
        assert_eq!(store.timespan(span.id).unwrap().end, Some(1500));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let store = Store::open_in_memory().unwrap();
        let span = store.open_timespan(1000).unwrap();
        let err = store.close_timespan(span.id, 999).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_close_at_start_is_valid() {
        let store = Store::open_in_memory().unwrap();
        let span = store.open_timespan(1000).unwrap();
        store.close_timespan(span.id, 1000).unwrap();
        assert_eq!(store.timespan(span.id).unwrap().end, Some(1000));
    }
}
