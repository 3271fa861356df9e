//! HLS serving for converted collections.
//!
//! Routes:
//! - `GET /hls/{collection_id}/{filename}` - manifest or media segment

mod segments;

pub use segments::{
    content_type_for, read_segment, resolve_segment_path, SegmentError,
    MANIFEST_CONTENT_TYPE, SEGMENT_CONTENT_TYPE,
};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::server::AppContext;

/// Create the HLS serving router.
pub fn hls_router() -> Router<AppContext> {
    Router::new().route("/:collection_id/:filename", get(serve_segment))
}

/// Serve one manifest or segment file.
///
/// VOD output never changes after conversion, so segments are served as
/// immutable; the manifest gets a short cache window.
async fn serve_segment(
    State(ctx): State<AppContext>,
    Path((collection_id, filename)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let (bytes, content_type) =
        read_segment(ctx.catalog.hls_root(), &collection_id, &filename)
            .await
            .map_err(|e| match e {
                SegmentError::Traversal => StatusCode::BAD_REQUEST,
                SegmentError::NotFound => StatusCode::NOT_FOUND,
                SegmentError::Io(err) => {
                    tracing::error!(collection = %collection_id, file = %filename, "Segment read failed: {}", err);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            })?;

    let cache_control = if content_type == MANIFEST_CONTENT_TYPE {
        "max-age=60"
    } else {
        "max-age=31536000, immutable"
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
