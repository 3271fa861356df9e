//! Video library: source discovery and the shared collection catalog.
//!
//! A collection is one converted movie: a directory under the HLS root
//! holding `playlist.m3u8` plus numbered `.ts` segments. The catalog is the
//! only cross-session shared metadata store; it is bulk-populated by the
//! conversion pipeline before the server accepts traffic, and afterwards only
//! touched by the best-effort duration enrichment callback.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source container extensions accepted by the discovery scan.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv"];

/// File name of the HLS manifest inside every collection directory.
/// Its presence is the durability marker for a completed conversion.
pub const MANIFEST_NAME: &str = "playlist.m3u8";

/// A raw video file awaiting (or already past) conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Identifier derived from the filename stem.
    pub id: String,
    /// Absolute path to the raw input file.
    pub path: PathBuf,
}

/// List source files with supported extensions, sorted by filename.
///
/// The deterministic order keeps repeated pipeline runs reproducible.
pub fn discover_sources(videos_dir: &Path) -> Result<Vec<SourceAsset>> {
    let entries = std::fs::read_dir(videos_dir)
        .with_context(|| format!("Failed to read videos directory: {:?}", videos_dir))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!("Skipping source with non-UTF8 name: {:?}", path);
            continue;
        };

        sources.push(SourceAsset {
            id: stem.to_string(),
            path: path.clone(),
        });
    }

    sources.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(sources)
}

/// Metadata for one converted collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub id: String,
    pub title: String,
    /// Best-known duration, zero until enriched by a client report.
    pub duration_secs: f64,
}

/// Shared, read-mostly collection metadata map.
pub struct Catalog {
    hls_root: PathBuf,
    entries: RwLock<HashMap<String, CollectionInfo>>,
}

impl Catalog {
    pub fn new(hls_root: PathBuf) -> Self {
        Self {
            hls_root,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Directory holding the collection's manifest and segments.
    pub fn collection_dir(&self, id: &str) -> PathBuf {
        self.hls_root.join(id)
    }

    pub fn hls_root(&self) -> &Path {
        &self.hls_root
    }

    /// Register a collection, keeping any previously enriched metadata.
    pub fn register(&self, id: &str) {
        let mut entries = self.entries.write();
        entries.entry(id.to_string()).or_insert_with(|| CollectionInfo {
            id: id.to_string(),
            title: id.to_string(),
            duration_secs: 0.0,
        });
    }

    pub fn get(&self, id: &str) -> Option<CollectionInfo> {
        self.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    /// All collection identifiers, sorted for stable listings.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn summaries(&self) -> Vec<CollectionInfo> {
        let mut all: Vec<CollectionInfo> = self.entries.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Apply a client-reported duration. Non-authoritative: negative or
    /// non-finite values are ignored. Returns false for unknown collections.
    pub fn set_duration(&self, id: &str, duration_secs: f64) -> bool {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            tracing::debug!(collection = %id, duration_secs, "Ignoring bogus duration report");
            return false;
        }

        let mut entries = self.entries.write();
        match entries.get_mut(id) {
            Some(info) => {
                info.duration_secs = duration_secs;
                true
            }
            None => false,
        }
    }
}
