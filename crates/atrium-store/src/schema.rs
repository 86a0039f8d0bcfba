use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subjects (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            tag_id     TEXT UNIQUE,
            location   TEXT NOT NULL DEFAULT 'out'
        );

        CREATE TABLE IF NOT EXISTS rooms (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            capacity   INTEGER
        );

        CREATE TABLE IF NOT EXISTS supervisors (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS base_groups (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            name               TEXT NOT NULL,
            room_id            INTEGER REFERENCES rooms(id),
            representative_id  INTEGER REFERENCES subjects(id)
        );

        CREATE TABLE IF NOT EXISTS group_supervisors (
            group_id       INTEGER NOT NULL REFERENCES base_groups(id),
            supervisor_id  INTEGER NOT NULL REFERENCES supervisors(id),
            PRIMARY KEY (group_id, supervisor_id)
        );

        CREATE TABLE IF NOT EXISTS timespans (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            start_secs  INTEGER NOT NULL,
            end_secs    INTEGER,
            created_at  TEXT NOT NULL,
            CHECK (end_secs IS NULL OR end_secs >= start_secs)
        );

        CREATE TABLE IF NOT EXISTS visits (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            day          TEXT NOT NULL,
            subject_id   INTEGER NOT NULL REFERENCES subjects(id),
            room_id      INTEGER NOT NULL REFERENCES rooms(id),
            timespan_id  INTEGER NOT NULL REFERENCES timespans(id),
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS combined_groups (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            name              TEXT NOT NULL,
            is_active         INTEGER NOT NULL DEFAULT 1,
            valid_until_secs  INTEGER,
            access_policy     TEXT NOT NULL DEFAULT 'all'
        );

        CREATE TABLE IF NOT EXISTS combined_group_members (
            combined_group_id  INTEGER NOT NULL REFERENCES combined_groups(id),
            group_id           INTEGER NOT NULL REFERENCES base_groups(id),
            PRIMARY KEY (combined_group_id, group_id)
        );

        CREATE TABLE IF NOT EXISTS combined_group_supervisors (
            combined_group_id  INTEGER NOT NULL REFERENCES combined_groups(id),
            supervisor_id      INTEGER NOT NULL REFERENCES supervisors(id),
            PRIMARY KEY (combined_group_id, supervisor_id)
        );

        CREATE TABLE IF NOT EXISTS device_registrations (
            device_id          TEXT PRIMARY KEY,
            room_id            INTEGER NOT NULL REFERENCES rooms(id),
            timespan_id        INTEGER NOT NULL REFERENCES timespans(id),
            group_id           INTEGER REFERENCES base_groups(id),
            combined_group_id  INTEGER REFERENCES combined_groups(id)
        );

        CREATE TABLE IF NOT EXISTS device_registration_supervisors (
            device_id      TEXT NOT NULL REFERENCES device_registrations(device_id)
                           ON DELETE CASCADE,
            supervisor_id  INTEGER NOT NULL REFERENCES supervisors(id),
            PRIMARY KEY (device_id, supervisor_id)
        );

        CREATE TABLE IF NOT EXISTS tag_reads (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id      TEXT NOT NULL,
            reader_id   TEXT NOT NULL,
            room_id     INTEGER,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_visits_subject ON visits(subject_id, day);
        CREATE INDEX IF NOT EXISTS idx_visits_room ON visits(room_id, day);
        CREATE INDEX IF NOT EXISTS idx_visits_timespan ON visits(timespan_id);
        CREATE INDEX IF NOT EXISTS idx_groups_room ON base_groups(room_id);
        CREATE INDEX IF NOT EXISTS idx_cg_members_group ON combined_group_members(group_id);
        CREATE INDEX IF NOT EXISTS idx_subjects_tag ON subjects(tag_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
