//! Request handlers.
//!
//! Scan endpoints answer HTTP 200 even when the tag or room cannot be
//! resolved; badge readers only distinguish transport failures from
//! everything else, so data problems ride inside the envelope.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::{error, warn};

use atrium_core::{
    CombinedGroupId, PresenceEvent, RoomId, SubjectId, now_unix_secs, parse_day, parse_iso8601,
};
use atrium_store::{MergeParams, Store, StoreError};

use crate::dto::*;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Resolve the scan envelope to a subject and room, or produce the
/// `success: false` response the reader expects for data issues.
fn resolve_scan(
    store: &Store,
    req: &ScanRequest,
) -> ApiResult<std::result::Result<(SubjectId, RoomId), ScanResponse>> {
    // raw read is an audit trail, failure to append must not block the scan
    if let Err(e) = store.log_tag_read(&req.tag_id, &req.reader_id, Some(RoomId(req.room_id))) {
        warn!(tag_id = %req.tag_id, error = %e, "failed to log tag read");
    }

    let subject = match store.subject_by_tag(&req.tag_id)? {
        Some(s) => s,
        None => {
            return Ok(Err(ScanResponse::rejected(format!(
                "unknown tag '{}'",
                req.tag_id
            ))));
        }
    };
    let room = match store.room(RoomId(req.room_id)) {
        Ok(r) => r,
        Err(StoreError::NotFound { .. }) => {
            return Ok(Err(ScanResponse::rejected(format!(
                "unknown room {}",
                req.room_id
            ))));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Ok((subject.id, room.id)))
}

pub async fn room_entry(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> ApiResult<Json<ScanResponse>> {
    let store = state.store().await;
    let (subject_id, room_id) = match resolve_scan(&store, &req)? {
        Ok(ids) => ids,
        Err(rejected) => return Ok(Json(rejected)),
    };

    let now = now_unix_secs();
    let visit = store.record_room_entry(subject_id, room_id, now)?;

    // the visit is already committed, a failed flag update must not
    // turn the response into an error
    if let Err(e) = store.update_location(subject_id, PresenceEvent::Entry) {
        error!(subject_id = %subject_id, error = %e, "failed to update location after entry");
    }

    let count = store.room_occupancy(room_id, now)?.count();
    Ok(Json(ScanResponse {
        success: true,
        message: format!("entry recorded for visit {}", visit.id),
        student_id: Some(subject_id.0),
        room_id: Some(room_id.0),
        student_count: Some(count),
    }))
}

pub async fn room_exit(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> ApiResult<Json<ScanResponse>> {
    let store = state.store().await;
    let (subject_id, room_id) = match resolve_scan(&store, &req)? {
        Ok(ids) => ids,
        Err(rejected) => return Ok(Json(rejected)),
    };

    let now = now_unix_secs();
    let closed = store.record_room_exit(subject_id, room_id, now)?;

    if closed > 0 {
        if let Err(e) = store.update_location(subject_id, PresenceEvent::Exit) {
            error!(subject_id = %subject_id, error = %e, "failed to update location after exit");
        }
    }

    let count = store.room_occupancy(room_id, now)?.count();
    let message = if closed > 0 {
        "exit recorded".to_string()
    } else {
        "no open visit to close".to_string()
    };
    Ok(Json(ScanResponse {
        success: true,
        message,
        student_id: Some(subject_id.0),
        room_id: Some(room_id.0),
        student_count: Some(count),
    }))
}

pub async fn room_occupancy(
    State(state): State<AppState>,
    Query(query): Query<OccupancyQuery>,
) -> ApiResult<Json<OccupancyResponse>> {
    let store = state.store().await;
    let now = now_unix_secs();
    let rooms = match query.room_id {
        Some(id) => vec![store.room_occupancy(RoomId(id), now)?],
        None => store.current_rooms(now)?,
    };
    Ok(Json(OccupancyResponse { rooms }))
}

fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::validation(format!("invalid {what} '{raw}'")))
}

fn parse_date_filter(date: Option<&str>) -> ApiResult<Option<String>> {
    match date {
        None => Ok(None),
        Some(raw) => parse_day(raw)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("invalid date '{raw}' (expected YYYY-MM-DD)"))),
    }
}

pub async fn student_visits(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<VisitsQuery>,
) -> ApiResult<Json<VisitsResponse>> {
    let subject_id = SubjectId(parse_id(&id, "student id")?);
    let day = parse_date_filter(query.date.as_deref())?;

    let store = state.store().await;
    store.subject(subject_id)?;
    let visits = store
        .visits_by_subject(subject_id, day.as_deref())?
        .iter()
        .map(|(v, t)| VisitDto::from_pair(v, t))
        .collect();
    Ok(Json(VisitsResponse { visits }))
}

pub async fn room_visits(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<VisitsQuery>,
) -> ApiResult<Json<VisitsResponse>> {
    let room_id = RoomId(parse_id(&id, "room id")?);
    let day = parse_date_filter(query.date.as_deref())?;
    let active_only = query.active.unwrap_or(false);

    let store = state.store().await;
    store.room(room_id)?;
    let now = now_unix_secs();
    let visits = store
        .visits_by_room(room_id, day.as_deref(), active_only, now)?
        .iter()
        .map(|(v, t)| VisitDto::from_pair(v, t))
        .collect();
    Ok(Json(VisitsResponse { visits }))
}

pub async fn today_visits(State(state): State<AppState>) -> ApiResult<Json<VisitsResponse>> {
    let store = state.store().await;
    let visits = store
        .today_visits(now_unix_secs())?
        .iter()
        .map(|(v, t)| VisitDto::from_pair(v, t))
        .collect();
    Ok(Json(VisitsResponse { visits }))
}

pub async fn merge_rooms(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> ApiResult<(StatusCode, Json<MergeResponse>)> {
    let source_room = req
        .source_room_id
        .ok_or_else(|| ApiError::validation("source_room_id is required"))?;
    let target_room = req
        .target_room_id
        .ok_or_else(|| ApiError::validation("target_room_id is required"))?;

    let valid_until = match req.valid_until.as_deref() {
        None => None,
        Some(raw) => Some(parse_iso8601(raw).ok_or_else(|| {
            ApiError::validation(format!("invalid valid_until '{raw}' (expected ISO 8601)"))
        })?),
    };
    let access_policy = match req.access_policy.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse().map_err(ApiError::Validation)?),
    };

    let params = MergeParams {
        source_room: RoomId(source_room),
        target_room: RoomId(target_room),
        name: req.name,
        valid_until,
        access_policy,
    };

    let store = state.store().await;
    let combined = store.merge_rooms(&params)?;
    Ok((
        StatusCode::CREATED,
        Json(MergeResponse {
            success: true,
            message: format!("combined group '{}' created", combined.name),
            combined_group: combined,
        }),
    ))
}

pub async fn list_combined_groups(
    State(state): State<AppState>,
) -> ApiResult<Json<CombinedGroupsResponse>> {
    let store = state.store().await;
    let combined_groups = store.active_combined_groups(now_unix_secs())?;
    Ok(Json(CombinedGroupsResponse { combined_groups }))
}

pub async fn deactivate_combined_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = CombinedGroupId(parse_id(&id, "combined group id")?);
    let store = state.store().await;
    store.deactivate_combined_group(id)?;
    Ok(Json(StatusResponse {
        success: true,
        message: format!("combined group {id} deactivated"),
    }))
}

pub async fn combined_group_for_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<atrium_core::CombinedGroup>> {
    let room_id = RoomId(parse_id(&id, "room id")?);
    let store = state.store().await;
    store.room(room_id)?;
    let combined = store.combined_group_for_room(room_id, now_unix_secs())?;
    Ok(Json(combined))
}
