//! Newtype wrappers for entity ids.
//!
//! All ids are `i64` rowids from the store; the wrappers keep a subject id
//! from being handed to a room query and vice versa.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

id_type!(
    /// A tracked person (student).
    SubjectId
);
id_type!(RoomId);
id_type!(
    /// A base group bound to at most one room.
    GroupId
);
id_type!(SupervisorId);
id_type!(TimespanId);
id_type!(VisitId);
id_type!(CombinedGroupId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SubjectId(456).to_string(), "456");
        assert_eq!(RoomId(101).to_string(), "101");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&SubjectId(7)).unwrap();
        assert_eq!(json, "7");
        let back: SubjectId = serde_json::from_str("7").unwrap();
        assert_eq!(back, SubjectId(7));
    }
}
