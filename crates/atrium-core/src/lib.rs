//! Domain model for the atrium presence-tracking engine.
//!
//! Tracks where subjects (students) physically are inside a facility from
//! asynchronous presence events: timespans bound presence sessions, visits
//! tie a subject to a room for one session, the location state machine
//! derives a coarse whereabouts variant per subject, and combined groups
//! temporarily merge two supervised spaces into one unit.
//!
//! Zero I/O — types and transition logic only, no opinions about transport
//! or persistence.

pub mod group;
pub mod ids;
pub mod location;
pub mod occupancy;
pub mod policy;
pub mod time;
pub mod timespan;
pub mod visit;

pub use group::{CombinedGroup, Group, Supervisor};
pub use ids::{
    CombinedGroupId, GroupId, RoomId, SubjectId, SupervisorId, TimespanId, VisitId,
};
pub use location::{Location, LocationFlags, PresenceEvent};
pub use occupancy::{Occupant, RoomOccupancy};
pub use policy::AccessPolicy;
pub use time::{day_from_unix, now_unix_secs, parse_day, parse_iso8601, unix_to_iso8601};
pub use timespan::Timespan;
pub use visit::Visit;
