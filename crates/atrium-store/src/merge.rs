//! The group merge coordinator: temporary combined groups spanning two
//! base groups/rooms, consolidating supervisory access.
//!
//! A merge is one transaction — the combined-group row, its member links
//! and its supervisor grants all land or none do. Expiry is handled by an
//! explicit idempotent reap invoked before the active-group reads, so the
//! reads themselves stay side-effect free.

use rusqlite::{Connection, OptionalExtension, params};

use atrium_core::{AccessPolicy, CombinedGroup, CombinedGroupId, Group, GroupId, RoomId, SupervisorId};

use crate::error::{Result, StoreError};
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct MergeParams {
    pub source_room: RoomId,
    pub target_room: RoomId,
    /// Defaults to `"<source group> + <target group>"`.
    pub name: Option<String>,
    /// Expiry instant, Unix seconds. `None` means no expiry.
    pub valid_until: Option<u64>,
    /// Defaults to `AccessPolicy::All`.
    pub access_policy: Option<AccessPolicy>,
}

impl Store {
    /// Merge two rooms into a combined group.
    ///
    /// Resolves the group bound to each room (at least one must resolve),
    /// then inserts the combined group, links every distinct resolved
    /// group, and grants the union of their supervisors — atomically.
    /// Returns the combined group hydrated with members and supervisors.
    pub fn merge_rooms(&self, params: &MergeParams) -> Result<CombinedGroup> {
        if params.source_room == params.target_room {
            return Err(StoreError::Validation(
                "source and target room are the same".to_string(),
            ));
        }

        let source = self.group_for_room(params.source_room)?;
        let target = self.group_for_room(params.target_room)?;
        if source.is_none() && target.is_none() {
            return Err(StoreError::Validation(
                "no group for either room".to_string(),
            ));
        }

        // dedup by id: both rooms may be bound to the same group
        let mut groups: Vec<Group> = Vec::new();
        for group in [source, target].into_iter().flatten() {
            if !groups.iter().any(|g| g.id == group.id) {
                groups.push(group);
            }
        }

        let name = match &params.name {
            Some(name) => name.clone(),
            None => groups
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(" + "),
        };
        let policy = params.access_policy.unwrap_or_default();

        let tx = self.conn().unchecked_transaction()?;

        tx.execute(
            "INSERT INTO combined_groups (name, is_active, valid_until_secs, access_policy)
             VALUES (?1, 1, ?2, ?3)",
            params![name, params.valid_until.map(|v| v as i64), policy.as_str()],
        )?;
        let id = CombinedGroupId(tx.last_insert_rowid());

        for group in &groups {
            tx.execute(
                "INSERT INTO combined_group_members (combined_group_id, group_id) VALUES (?1, ?2)",
                params![id.0, group.id.0],
            )?;
        }

        // union of the member groups' supervisors, deduplicated by the
        // (combined_group_id, supervisor_id) primary key
        for group in &groups {
            for supervisor in &group.supervisor_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO combined_group_supervisors
                     (combined_group_id, supervisor_id) VALUES (?1, ?2)",
                    params![id.0, supervisor.0],
                )?;
            }
        }

        let combined = load_combined_group(&tx, id)?.ok_or(StoreError::NotFound {
            kind: "combined group",
            id: id.0,
        })?;
        tx.commit()?;
        Ok(combined)
    }

    pub fn combined_group(&self, id: CombinedGroupId) -> Result<CombinedGroup> {
        load_combined_group(self.conn(), id)?.ok_or(StoreError::NotFound {
            kind: "combined group",
            id: id.0,
        })
    }

    /// The live combined group linking the room's bound group, if any.
    /// Reaps expired rows first so a stale merge never resolves.
    pub fn combined_group_for_room(&self, room_id: RoomId, now: u64) -> Result<CombinedGroup> {
        self.reap_expired_combined_groups(now)?;

        let group = self
            .group_for_room(room_id)?
            .ok_or(StoreError::NotFound {
                kind: "group for room",
                id: room_id.0,
            })?;

        let id = self
            .conn()
            .query_row(
                "SELECT cg.id
                 FROM combined_groups cg
                 JOIN combined_group_members m ON m.combined_group_id = cg.id
                 WHERE m.group_id = ?1 AND cg.is_active = 1
                   AND (cg.valid_until_secs IS NULL OR cg.valid_until_secs > ?2)
                 ORDER BY cg.id DESC LIMIT 1",
                params![group.id.0, now as i64],
                |row| Ok(CombinedGroupId(row.get(0)?)),
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: "combined group for room",
                id: room_id.0,
            })?;

        self.combined_group(id)
    }

    /// All live combined groups (active, not expired), after reaping.
    pub fn active_combined_groups(&self, now: u64) -> Result<Vec<CombinedGroup>> {
        self.reap_expired_combined_groups(now)?;

        let mut stmt = self.conn().prepare(
            "SELECT id FROM combined_groups
             WHERE is_active = 1
               AND (valid_until_secs IS NULL OR valid_until_secs > ?1)
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map([now as i64], |row| Ok(CombinedGroupId(row.get(0)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        ids.into_iter().map(|id| self.combined_group(id)).collect()
    }

    /// Flip `is_active` on every row whose `valid_until` has elapsed.
    /// Idempotent — the only mutation on the read path, safe under
    /// concurrent reapers. Returns the number of rows expired.
    pub fn reap_expired_combined_groups(&self, now: u64) -> Result<usize> {
        let reaped = self.conn().execute(
            "UPDATE combined_groups SET is_active = 0
             WHERE is_active = 1 AND valid_until_secs IS NOT NULL AND valid_until_secs <= ?1",
            [now as i64],
        )?;
        if reaped > 0 {
            tracing::info!(reaped, "expired combined group(s) deactivated");
        }
        Ok(reaped)
    }

    /// Deactivate a combined group. Idempotent: already-inactive (or
    /// unknown) ids are a no-op, not an error.
    pub fn deactivate_combined_group(&self, id: CombinedGroupId) -> Result<()> {
        self.conn().execute(
            "UPDATE combined_groups SET is_active = 0 WHERE id = ?1",
            [id.0],
        )?;
        Ok(())
    }
}

fn load_combined_group(conn: &Connection, id: CombinedGroupId) -> Result<Option<CombinedGroup>> {
    let header = conn
        .query_row(
            "SELECT id, name, is_active, valid_until_secs, access_policy
             FROM combined_groups WHERE id = ?1",
            [id.0],
            |row| {
                Ok((
                    CombinedGroupId(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? != 0,
                    row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, name, is_active, valid_until, policy_raw)) = header else {
        return Ok(None);
    };
    let access_policy: AccessPolicy = policy_raw
        .parse()
        .map_err(|e: String| StoreError::InvalidData(e))?;

    let mut stmt = conn.prepare(
        "SELECT g.id, g.name, g.room_id, g.representative_id
         FROM combined_group_members m
         JOIN base_groups g ON g.id = m.group_id
         WHERE m.combined_group_id = ?1 ORDER BY g.id",
    )?;
    let mut member_groups = stmt
        .query_map([id.0], |row| {
            Ok(Group {
                id: GroupId(row.get(0)?),
                name: row.get(1)?,
                room_id: row.get::<_, Option<i64>>(2)?.map(RoomId),
                representative_id: row.get::<_, Option<i64>>(3)?.map(atrium_core::SubjectId),
                supervisor_ids: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for group in &mut member_groups {
        let mut stmt = conn.prepare(
            "SELECT supervisor_id FROM group_supervisors
             WHERE group_id = ?1 ORDER BY supervisor_id",
        )?;
        group.supervisor_ids = stmt
            .query_map([group.id.0], |row| Ok(SupervisorId(row.get(0)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
    }

    let mut stmt = conn.prepare(
        "SELECT supervisor_id FROM combined_group_supervisors
         WHERE combined_group_id = ?1 ORDER BY supervisor_id",
    )?;
    let access_supervisor_ids = stmt
        .query_map([id.0], |row| Ok(SupervisorId(row.get(0)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(CombinedGroup {
        id,
        name,
        is_active,
        valid_until,
        access_policy,
        member_groups,
        access_supervisor_ids,
    }))
}
