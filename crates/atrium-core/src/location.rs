//! Coarse-grained location state machine.
//!
//! Historically this was three independent booleans per subject
//! (`in_house`, `in_wc`, `in_school_yard`), which permitted inconsistent
//! combinations. Here it is a single variant; the transition table is
//! enforced by construction and the boolean view is derived for API
//! responses.

use serde::{Deserialize, Serialize};

/// The event tag carried by a presence scan, keyed by reader kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceEvent {
    Entry,
    Wc,
    SchoolYard,
    Exit,
}

impl std::str::FromStr for PresenceEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(PresenceEvent::Entry),
            "wc" => Ok(PresenceEvent::Wc),
            "schoolyard" => Ok(PresenceEvent::SchoolYard),
            "exit" => Ok(PresenceEvent::Exit),
            other => Err(format!("unknown presence event '{other}'")),
        }
    }
}

impl PresenceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceEvent::Entry => "entry",
            PresenceEvent::Wc => "wc",
            PresenceEvent::SchoolYard => "schoolyard",
            PresenceEvent::Exit => "exit",
        }
    }
}

/// Where a subject currently is, at building granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[default]
    Out,
    InHouse,
    /// In the building, currently at the WC.
    InHouseWc,
    SchoolYard,
}

/// The legacy tri-boolean view, kept for API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFlags {
    pub in_house: bool,
    pub in_wc: bool,
    pub in_school_yard: bool,
}

impl Location {
    /// Apply a presence event. Unconditional and last-write-wins: applying
    /// the same event twice is a no-op, and any event is valid from any
    /// state.
    pub fn after(self, event: PresenceEvent) -> Location {
        match event {
            PresenceEvent::Entry => Location::InHouse,
            PresenceEvent::Wc => Location::InHouseWc,
            PresenceEvent::SchoolYard => Location::SchoolYard,
            PresenceEvent::Exit => Location::Out,
        }
    }

    pub fn flags(self) -> LocationFlags {
        match self {
            Location::Out => LocationFlags {
                in_house: false,
                in_wc: false,
                in_school_yard: false,
            },
            Location::InHouse => LocationFlags {
                in_house: true,
                in_wc: false,
                in_school_yard: false,
            },
            Location::InHouseWc => LocationFlags {
                in_house: true,
                in_wc: true,
                in_school_yard: false,
            },
            Location::SchoolYard => LocationFlags {
                in_house: false,
                in_wc: false,
                in_school_yard: true,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Out => "out",
            Location::InHouse => "in_house",
            Location::InHouseWc => "in_house_wc",
            Location::SchoolYard => "school_yard",
        }
    }
}

impl std::str::FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out" => Ok(Location::Out),
            "in_house" => Ok(Location::InHouse),
            "in_house_wc" => Ok(Location::InHouseWc),
            "school_yard" => Ok(Location::SchoolYard),
            other => Err(format!("unknown location '{other}'")),
        }
    }
}
