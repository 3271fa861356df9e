//! Library API routes: collection listing and metadata enrichment.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::AppContext;

/// Create library routes.
pub fn library_routes() -> Router<AppContext> {
    Router::new()
        .route("/collections", get(list_collections))
        .route("/collections/:collection_id/duration", post(report_duration))
}

/// List all converted collections with best-known metadata.
async fn list_collections(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.catalog.summaries())
}

#[derive(Debug, Deserialize)]
pub struct DurationReport {
    pub duration_secs: f64,
}

/// Accept a client-reported duration for a collection.
///
/// Best-effort enrichment, not authoritative: bogus values are dropped and
/// the stored value may be overwritten by later reports.
async fn report_duration(
    State(ctx): State<AppContext>,
    Path(collection_id): Path<String>,
    Json(report): Json<DurationReport>,
) -> impl IntoResponse {
    if !ctx.catalog.contains(&collection_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "unknown collection"})),
        )
            .into_response();
    }

    ctx.catalog.set_duration(&collection_id, report.duration_secs);
    match ctx.catalog.get(&collection_id) {
        Some(info) => Json(info).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
