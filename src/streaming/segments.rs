//! Segment reads for converted collections.
//!
//! Resolves a (collection, file name) pair to bytes and a content type.
//! Reads go through `tokio::fs` so a slow disk never stalls the scheduler,
//! and any name that would escape the collection directory is rejected
//! before touching the filesystem.

use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Content type for the HLS manifest.
pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
/// Content type for MPEG-TS media segments.
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

#[derive(Debug, Error)]
pub enum SegmentError {
    /// The requested name resolves outside the collection directory.
    #[error("path escapes the collection directory")]
    Traversal,

    #[error("segment not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// True when every component of `part` is a plain name (no `..`, no root,
/// no drive prefix) and the string is non-empty.
fn is_plain_relative(part: &str) -> bool {
    if part.is_empty() {
        return false;
    }
    Path::new(part)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// Join the HLS root, collection id and file name, rejecting traversal.
pub fn resolve_segment_path(
    hls_root: &Path,
    collection_id: &str,
    name: &str,
) -> Result<PathBuf, SegmentError> {
    if !is_plain_relative(collection_id) || !is_plain_relative(name) {
        return Err(SegmentError::Traversal);
    }
    Ok(hls_root.join(collection_id).join(name))
}

/// Content type by file name: manifest mime for `.m3u8`, segment mime
/// otherwise.
pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".m3u8") {
        MANIFEST_CONTENT_TYPE
    } else {
        SEGMENT_CONTENT_TYPE
    }
}

/// Read one manifest or segment file from a collection.
pub async fn read_segment(
    hls_root: &Path,
    collection_id: &str,
    name: &str,
) -> Result<(Bytes, &'static str), SegmentError> {
    let path = resolve_segment_path(hls_root, collection_id, name)?;

    let data = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SegmentError::NotFound
        } else {
            SegmentError::Io(e)
        }
    })?;

    Ok((Bytes::from(data), content_type_for(name)))
}
