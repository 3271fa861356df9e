//! Session and playback API routes.
//!
//! Admission gates entry: a session must hold a channel slot before the
//! playback routes accept it. Every playback request heartbeats the slot so
//! the idle-eviction task only reclaims genuinely abandoned channels.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use super::AppContext;
use crate::playback::PlaylistView;

/// Create session routes.
pub fn session_routes() -> Router<AppContext> {
    Router::new()
        .route("/session/:session_id/admit", post(admit))
        .route(
            "/session/:session_id/playlist",
            axum::routing::get(playlist_state),
        )
        .route("/session/:session_id/next", post(next_video))
        .route("/session/:session_id/select/:collection_id", post(select_video))
        .route("/session/:session_id/shuffle", post(shuffle_videos))
        .route("/session/:session_id/release", post(release))
}

fn capacity_exceeded() -> axum::response::Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({"error": "all channels are in use, please try again later"})),
    )
        .into_response()
}

fn no_slot() -> axum::response::Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({"error": "session holds no channel slot, admit first"})),
    )
        .into_response()
}

fn empty_library() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "no collections available"})),
    )
        .into_response()
}

fn view_response(view: Option<PlaylistView>) -> axum::response::Response {
    match view {
        Some(view) => Json(view).into_response(),
        None => empty_library(),
    }
}

/// Admit a session to a channel slot (idempotent for active sessions) and
/// return its current playlist position.
async fn admit(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    // Nothing to play means no slot is consumed.
    if ctx.catalog.is_empty() {
        return empty_library();
    }
    if !ctx.channels.try_admit(&session_id) {
        return capacity_exceeded();
    }
    view_response(ctx.playlists.current(&session_id))
}

/// Current collection without moving the cursor.
async fn playlist_state(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    if !ctx.channels.touch(&session_id) {
        return no_slot();
    }
    view_response(ctx.playlists.current(&session_id))
}

/// Skip to the next collection (wraps at the end of the playlist).
async fn next_video(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    if !ctx.channels.touch(&session_id) {
        return no_slot();
    }
    view_response(ctx.playlists.advance(&session_id))
}

/// Jump to a named collection. Unknown ids leave the position unchanged.
async fn select_video(
    State(ctx): State<AppContext>,
    Path((session_id, collection_id)): Path<(String, String)>,
) -> impl IntoResponse {
    if !ctx.channels.touch(&session_id) {
        return no_slot();
    }
    view_response(ctx.playlists.jump(&session_id, &collection_id))
}

/// Replace the session's playlist with a fresh shuffle.
async fn shuffle_videos(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    if !ctx.channels.touch(&session_id) {
        return no_slot();
    }
    view_response(ctx.playlists.reshuffle(&session_id))
}

/// Free the session's channel slot and playlist.
async fn release(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    ctx.channels.release(&session_id);
    ctx.playlists.remove(&session_id);
    StatusCode::NO_CONTENT
}
