//! SQLite persistence for the atrium presence engine.
//!
//! One `Store` per database file, fully wired at construction. All
//! multi-step writes (entry/exit, merges, device registration) run inside
//! a single SQLite transaction; a failure mid-way rolls the whole
//! operation back.

pub mod devices;
pub mod error;
pub mod merge;
pub mod occupancy;
pub mod schema;
pub mod store;
pub mod timespans;
pub mod visits;

pub use error::{Result, StoreError};
pub use merge::MergeParams;
pub use store::{DeviceRegistration, Room, Store, Subject};
