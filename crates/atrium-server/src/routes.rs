use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/room-entry", post(handlers::room_entry))
        .route("/room-exit", post(handlers::room_exit))
        .route("/room-occupancy", get(handlers::room_occupancy))
        .route("/student/{id}/visits", get(handlers::student_visits))
        .route("/room/{id}/visits", get(handlers::room_visits))
        .route("/visits/today", get(handlers::today_visits))
        .route("/combined_groups/merge", post(handlers::merge_rooms))
        .route("/combined_groups", get(handlers::list_combined_groups))
        .route(
            "/combined_groups/{id}",
            delete(handlers::deactivate_combined_group),
        )
        .route(
            "/rooms/{id}/combined_group",
            get(handlers::combined_group_for_room),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
