//! Tablet-bound room sessions. One active registration per device;
//! registering opens a timespan that the unregister closes.

use rusqlite::{OptionalExtension, params};

use atrium_core::{CombinedGroupId, GroupId, RoomId, SupervisorId, TimespanId};

use crate::error::{Result, StoreError};
use crate::store::{DeviceRegistration, Store};
use crate::timespans::{close_timespan_on, open_timespan_on};

impl Store {
    /// Register a device to a room session. `Conflict` if the device
    /// already holds an active registration.
    pub fn register_device(
        &self,
        device_id: &str,
        room_id: RoomId,
        group_id: Option<GroupId>,
        combined_group_id: Option<CombinedGroupId>,
        supervisor_ids: &[SupervisorId],
        now: u64,
    ) -> Result<DeviceRegistration> {
        self.room(room_id)?;
        if self.device_registration(device_id)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "device '{device_id}' already registered"
            )));
        }

        let tx = self.conn().unchecked_transaction()?;

        let span = open_timespan_on(&tx, now)?;
        tx.execute(
            "INSERT INTO device_registrations
             (device_id, room_id, timespan_id, group_id, combined_group_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                device_id,
                room_id.0,
                span.id.0,
                group_id.map(|g| g.0),
                combined_group_id.map(|c| c.0)
            ],
        )?;
        for supervisor in supervisor_ids {
            tx.execute(
                "INSERT OR IGNORE INTO device_registration_supervisors
                 (device_id, supervisor_id) VALUES (?1, ?2)",
                params![device_id, supervisor.0],
            )?;
        }

        tx.commit()?;

        Ok(DeviceRegistration {
            device_id: device_id.to_string(),
            room_id,
            timespan_id: span.id,
            group_id,
            combined_group_id,
            supervisor_ids: supervisor_ids.to_vec(),
        })
    }

    /// Close the device's session: its timespan gets an end and the
    /// registration row is removed. `NotFound` for unknown devices.
    pub fn unregister_device(&self, device_id: &str, now: u64) -> Result<()> {
        let registration = self
            .device_registration(device_id)?
            .ok_or(StoreError::NotFound {
                kind: "device registration",
                id: 0,
            })?;

        let tx = self.conn().unchecked_transaction()?;
        close_timespan_on(&tx, registration.timespan_id, now)?;
        tx.execute(
            "DELETE FROM device_registrations WHERE device_id = ?1",
            [device_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn device_registration(&self, device_id: &str) -> Result<Option<DeviceRegistration>> {
        let header = self
            .conn()
            .query_row(
                "SELECT device_id, room_id, timespan_id, group_id, combined_group_id
                 FROM device_registrations WHERE device_id = ?1",
                [device_id],
                |row| {
                    Ok(DeviceRegistration {
                        device_id: row.get(0)?,
                        room_id: RoomId(row.get(1)?),
                        timespan_id: TimespanId(row.get(2)?),
                        group_id: row.get::<_, Option<i64>>(3)?.map(GroupId),
                        combined_group_id: row.get::<_, Option<i64>>(4)?.map(CombinedGroupId),
                        supervisor_ids: Vec::new(),
                    })
                },
            )
            .optional()?;

        match header {
            None => Ok(None),
            Some(mut reg) => {
                let mut stmt = self.conn().prepare(
                    "SELECT supervisor_id FROM device_registration_supervisors
                     WHERE device_id = ?1 ORDER BY supervisor_id",
                )?;
                reg.supervisor_ids = stmt
                    .query_map([device_id], |row| Ok(SupervisorId(row.get(0)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Some(reg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Store, RoomId, SupervisorId) {
        let store = Store::open_in_memory().unwrap();
        let room = store.add_room("101", None).unwrap();
        let sup = store.add_supervisor("Berg").unwrap();
        (store, room, sup)
    }

    #[test]
    fn test_register_then_lookup() {
        let (store, room, sup) = seeded();
        let reg = store
            .register_device("tablet-1", room, None, None, &[sup], 1000)
            .unwrap();

        let found = store.device_registration("tablet-1").unwrap().unwrap();
        assert_eq!(found, reg);
        assert!(store.timespan(reg.timespan_id).unwrap().end.is_none());
    }

    #[test]
    fn test_double_register_conflicts() {
        let (store, room, _) = seeded();
        store
            .register_device("tablet-1", room, None, None, &[], 1000)
            .unwrap();
        let err = store
            .register_device("tablet-1", room, None, None, &[], 2000)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_unregister_closes_timespan_and_frees_device() {
        let (store, room, _) = seeded();
        let reg = store
            .register_device("tablet-1", room, None, None, &[], 1000)
            .unwrap();

        store.unregister_device("tablet-1", 4600).unwrap();
        assert_eq!(store.timespan(reg.timespan_id).unwrap().end, Some(4600));
        assert!(store.device_registration("tablet-1").unwrap().is_none());

        // device can register again afterwards
        store
            .register_device("tablet-1", room, None, None, &[], 5000)
            .unwrap();
    }

    #[test]
    fn test_unregister_unknown_device() {
        let (store, _, _) = seeded();
        let err = store.unregister_device("ghost", 100).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
