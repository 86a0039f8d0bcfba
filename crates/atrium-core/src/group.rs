//! Groups and temporary combined groups.
//!
//! A base group owns a class of subjects and is bound to at most one room
//! (a documented 0..1 relation — the store exposes a dedicated accessor).
//! A combined group is a temporary aggregation of two or more base groups
//! created by a room merge, granting consolidated supervisory access
//! until it is deactivated or its `valid_until` elapses.

use serde::{Deserialize, Serialize};

use crate::ids::{CombinedGroupId, GroupId, RoomId, SubjectId, SupervisorId};
use crate::policy::AccessPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supervisor {
    pub id: SupervisorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub room_id: Option<RoomId>,
    pub representative_id: Option<SubjectId>,
    pub supervisor_ids: Vec<SupervisorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedGroup {
    pub id: CombinedGroupId,
    pub name: String,
    pub is_active: bool,
    /// Expiry instant, Unix seconds. `None` means no expiry.
    pub valid_until: Option<u64>,
    pub access_policy: AccessPolicy,
    /// Member groups, hydrated and deduplicated by id.
    pub member_groups: Vec<Group>,
    /// Union of the member groups' supervisors, deduplicated by id.
    pub access_supervisor_ids: Vec<SupervisorId>,
}

impl CombinedGroup {
    /// Live means active and not yet expired. State machine:
    /// `none → active → {expired | deactivated}`, both terminal.
    pub fn is_live_at(&self, now: u64) -> bool {
        self.is_active
            && match self.valid_until {
                None => true,
                Some(until) => until > now,
            }
    }

    /// The default name for a merge of two groups.
    pub fn default_name(source: &Group, target: &Group) -> String {
        format!("{} + {}", source.name, target.name)
    }
}
