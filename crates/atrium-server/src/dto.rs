//! Wire types for the HTTP surface.

use serde::{Deserialize, Serialize};

use atrium_core::{CombinedGroup, RoomOccupancy, Timespan, Visit};

/// Scan envelope posted by badge readers on entry and exit.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub tag_id: String,
    pub room_id: i64,
    pub reader_id: String,
}

/// Always returned with HTTP 200; `success: false` covers data issues
/// (unknown tag or room) that the reader hardware should not treat as
/// transport failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_count: Option<usize>,
}

impl ScanResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            student_id: None,
            room_id: None,
            student_count: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    pub room_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VisitsQuery {
    pub date: Option<String>,
    pub active: Option<bool>,
}

/// One ledger row joined with its timespan, rendered for clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct VisitDto {
    pub visit_id: i64,
    pub day: String,
    pub student_id: i64,
    pub room_id: i64,
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl VisitDto {
    pub fn from_pair(visit: &Visit, span: &Timespan) -> Self {
        Self {
            visit_id: visit.id.0,
            day: visit.day.clone(),
            student_id: visit.subject_id.0,
            room_id: visit.room_id.0,
            start: span.start_iso8601(),
            end: span.end_iso8601(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitsResponse {
    pub visits: Vec<VisitDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OccupancyResponse {
    pub rooms: Vec<RoomOccupancy>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub source_room_id: Option<i64>,
    pub target_room_id: Option<i64>,
    pub name: Option<String>,
    /// ISO 8601 expiry instant. Absent means no expiry.
    pub valid_until: Option<String>,
    pub access_policy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MergeResponse {
    pub success: bool,
    pub message: String,
    pub combined_group: CombinedGroup,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CombinedGroupsResponse {
    pub combined_groups: Vec<CombinedGroup>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
