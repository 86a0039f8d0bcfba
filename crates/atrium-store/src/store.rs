use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use atrium_core::time::now_iso8601;
use atrium_core::{Group, GroupId, Location, PresenceEvent, RoomId, SubjectId, SupervisorId};

use crate::error::{Result, StoreError};
use crate::schema;

/// A tracked person, as resolved by the identity lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub tag_id: Option<String>,
    pub location: Location,
}

/// Reference record for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: Option<i64>,
}

/// An active tablet-bound room session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub device_id: String,
    pub room_id: RoomId,
    pub timespan_id: atrium_core::TimespanId,
    pub group_id: Option<GroupId>,
    pub combined_group_id: Option<atrium_core::CombinedGroupId>,
    pub supervisor_ids: Vec<SupervisorId>,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a store at `path`, fully wired: schema applied,
    /// pragmas set. There is no partially-constructed state.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Reference data (thin collaborators, not a CRUD surface) ---

    pub fn add_subject(&self, name: &str, tag_id: Option<&str>) -> Result<SubjectId> {
        self.conn.execute(
            "INSERT INTO subjects (name, tag_id) VALUES (?1, ?2)",
            params![name, tag_id],
        )?;
        Ok(SubjectId(self.conn.last_insert_rowid()))
    }

    pub fn subject(&self, id: SubjectId) -> Result<Subject> {
        self.conn
            .query_row(
                "SELECT id, name, tag_id, location FROM subjects WHERE id = ?1",
                [id.0],
                row_to_subject,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: "subject",
                id: id.0,
            })
    }

    /// Identity resolution: scanned tag → tracked subject.
    pub fn subject_by_tag(&self, tag_id: &str) -> Result<Option<Subject>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, tag_id, location FROM subjects WHERE tag_id = ?1",
                [tag_id],
                row_to_subject,
            )
            .optional()?)
    }

    pub fn add_room(&self, name: &str, capacity: Option<i64>) -> Result<RoomId> {
        self.conn.execute(
            "INSERT INTO rooms (name, capacity) VALUES (?1, ?2)",
            params![name, capacity],
        )?;
        Ok(RoomId(self.conn.last_insert_rowid()))
    }

    pub fn room(&self, id: RoomId) -> Result<Room> {
        self.conn
            .query_row(
                "SELECT id, name, capacity FROM rooms WHERE id = ?1",
                [id.0],
                |row| {
                    Ok(Room {
                        id: RoomId(row.get(0)?),
                        name: row.get(1)?,
                        capacity: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: "room",
                id: id.0,
            })
    }

    pub fn add_supervisor(&self, name: &str) -> Result<SupervisorId> {
        self.conn
            .execute("INSERT INTO supervisors (name) VALUES (?1)", [name])?;
        Ok(SupervisorId(self.conn.last_insert_rowid()))
    }

    pub fn add_group(
        &self,
        name: &str,
        room_id: Option<RoomId>,
        representative_id: Option<SubjectId>,
    ) -> Result<GroupId> {
        self.conn.execute(
            "INSERT INTO base_groups (name, room_id, representative_id) VALUES (?1, ?2, ?3)",
            params![name, room_id.map(|r| r.0), representative_id.map(|s| s.0)],
        )?;
        Ok(GroupId(self.conn.last_insert_rowid()))
    }

    pub fn assign_supervisor(&self, group_id: GroupId, supervisor_id: SupervisorId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO group_supervisors (group_id, supervisor_id) VALUES (?1, ?2)",
            params![group_id.0, supervisor_id.0],
        )?;
        Ok(())
    }

    pub fn group(&self, id: GroupId) -> Result<Group> {
        let mut group = self
            .conn
            .query_row(
                "SELECT id, name, room_id, representative_id FROM base_groups WHERE id = ?1",
                [id.0],
                row_to_group,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: "group",
                id: id.0,
            })?;
        group.supervisor_ids = self.group_supervisor_ids(id)?;
        Ok(group)
    }

    /// The group bound to a room. Room→Group is a 0..1 relation; should the
    /// data ever hold more than one binding, the oldest wins and the
    /// anomaly is logged.
    pub fn group_for_room(&self, room_id: RoomId) -> Result<Option<Group>> {
        let bound: i64 = self.conn.query_row(
            "SELECT count(*) FROM base_groups WHERE room_id = ?1",
            [room_id.0],
            |row| row.get(0),
        )?;
        if bound > 1 {
            tracing::warn!(room_id = room_id.0, bound, "room bound to more than one group");
        }

        let group = self
            .conn
            .query_row(
                "SELECT id, name, room_id, representative_id FROM base_groups
                 WHERE room_id = ?1 ORDER BY id LIMIT 1",
                [room_id.0],
                row_to_group,
            )
            .optional()?;

        match group {
            None => Ok(None),
            Some(mut g) => {
                g.supervisor_ids = self.group_supervisor_ids(g.id)?;
                Ok(Some(g))
            }
        }
    }

    pub(crate) fn group_supervisor_ids(&self, group_id: GroupId) -> Result<Vec<SupervisorId>> {
        let mut stmt = self.conn.prepare(
            "SELECT supervisor_id FROM group_supervisors WHERE group_id = ?1 ORDER BY supervisor_id",
        )?;
        let ids = stmt
            .query_map([group_id.0], |row| Ok(SupervisorId(row.get(0)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // --- Location state machine (persistence side) ---

    /// Apply a presence event to the subject's location variant.
    /// Last-write-wins; the transition table lives in `atrium_core`.
    pub fn update_location(&self, subject_id: SubjectId, event: PresenceEvent) -> Result<Location> {
        let current = self.location_of(subject_id)?;
        let next = current.after(event);
        self.conn.execute(
            "UPDATE subjects SET location = ?1 WHERE id = ?2",
            params![next.as_str(), subject_id.0],
        )?;
        Ok(next)
    }

    pub fn location_of(&self, subject_id: SubjectId) -> Result<Location> {
        let raw: String = self
            .conn
            .query_row(
                "SELECT location FROM subjects WHERE id = ?1",
                [subject_id.0],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: "subject",
                id: subject_id.0,
            })?;
        raw.parse()
            .map_err(|e: String| StoreError::InvalidData(e))
    }

    // --- Raw scan audit log (callers treat failures as best-effort) ---

    pub fn log_tag_read(&self, tag_id: &str, reader_id: &str, room_id: Option<RoomId>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tag_reads (tag_id, reader_id, room_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![tag_id, reader_id, room_id.map(|r| r.0), now_iso8601()],
        )?;
        Ok(())
    }
}

fn row_to_subject(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subject> {
    let raw: String = row.get(3)?;
    Ok(Subject {
        id: SubjectId(row.get(0)?),
        name: row.get(1)?,
        tag_id: row.get(2)?,
        location: raw.parse().unwrap_or_default(),
    })
}

fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(row.get(0)?),
        name: row.get(1)?,
        room_id: row.get::<_, Option<i64>>(2)?.map(RoomId),
        representative_id: row.get::<_, Option<i64>>(3)?.map(SubjectId),
        supervisor_ids: Vec::new(),
    })
}
