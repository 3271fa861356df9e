//! One-time conversion pipeline.
//!
//! Discovers source files, skips collections whose manifest already exists,
//! and fans out encoder invocations with bounded concurrency. The pipeline
//! completes only when every scheduled encode has resolved; a single asset's
//! failure never aborts its siblings. Safe to re-invoke on every startup.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::library::{discover_sources, Catalog, MANIFEST_NAME};
use crate::transcode::Transcoder;

/// Per-asset result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Encoded during this run.
    Converted,
    /// Manifest already present; no encode scheduled.
    AlreadyConverted,
    /// Encode failed; the asset stays unavailable until a later retry.
    Failed(String),
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converted => write!(f, "converted"),
            Self::AlreadyConverted => write!(f, "already converted"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Asset id -> outcome, ordered for stable reporting.
pub type ConversionReport = BTreeMap<String, ConversionOutcome>;

/// Runs the library conversion at startup.
pub struct ConversionPipeline {
    transcoder: Arc<dyn Transcoder>,
    videos_dir: PathBuf,
    catalog: Arc<Catalog>,
    max_parallel: usize,
}

impl ConversionPipeline {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        videos_dir: PathBuf,
        catalog: Arc<Catalog>,
        max_parallel: usize,
    ) -> Self {
        Self {
            transcoder,
            videos_dir,
            catalog,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Convert every source file that does not yet have a manifest.
    ///
    /// Registers all available collections in the catalog and returns the
    /// per-asset report. Idempotent: a second run over the same directories
    /// performs zero encode invocations.
    pub async fn ensure_all_converted(&self) -> Result<ConversionReport> {
        let sources = discover_sources(&self.videos_dir)?;
        info!(
            count = sources.len(),
            videos_dir = %self.videos_dir.display(),
            "Discovered source files"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut report = ConversionReport::new();
        let mut encodes: JoinSet<(String, Result<(), String>)> = JoinSet::new();

        for asset in sources {
            let output_dir = self.catalog.collection_dir(&asset.id);

            if output_dir.join(MANIFEST_NAME).exists() {
                report.insert(asset.id, ConversionOutcome::AlreadyConverted);
                continue;
            }

            // An unwritable output directory is fatal to this asset only,
            // like any other per-asset failure.
            if let Err(e) = std::fs::create_dir_all(&output_dir) {
                error!(asset = %asset.id, error = %e, "Failed to create output directory");
                report.insert(
                    asset.id,
                    ConversionOutcome::Failed(format!("create output dir: {}", e)),
                );
                continue;
            }

            let semaphore = Arc::clone(&semaphore);
            let transcoder = Arc::clone(&self.transcoder);
            encodes.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (asset.id, Err("conversion pool closed".to_string())),
                };
                info!(asset = %asset.id, "Converting to HLS");
                let result = transcoder
                    .encode(&asset.path, &output_dir)
                    .await
                    .map_err(|e| e.to_string());
                (asset.id, result)
            });
        }

        // Fan-in barrier: wait for every scheduled encode, success or not.
        while let Some(joined) = encodes.join_next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    info!(asset = %id, "Conversion completed");
                    report.insert(id, ConversionOutcome::Converted);
                }
                Ok((id, Err(reason))) => {
                    error!(asset = %id, %reason, "Conversion failed");
                    report.insert(id, ConversionOutcome::Failed(reason));
                }
                Err(join_err) => {
                    error!("Encode task aborted: {}", join_err);
                }
            }
        }

        for (id, outcome) in &report {
            if !matches!(outcome, ConversionOutcome::Failed(_)) {
                self.catalog.register(id);
            }
        }

        // Collections converted in an earlier run stay playable even after
        // their source file is removed. Pick up any manifest-bearing
        // directory the source scan did not account for.
        let hls_root = self.catalog.hls_root();
        if hls_root.is_dir() {
            for entry in std::fs::read_dir(hls_root)? {
                let path = entry?.path();
                if !path.join(MANIFEST_NAME).is_file() {
                    continue;
                }
                if let Some(id) = path.file_name().and_then(|n| n.to_str()) {
                    if !report.contains_key(id) {
                        info!(asset = %id, "Registering converted collection without a source file");
                        self.catalog.register(id);
                    }
                }
            }
        }

        info!(
            available = self.catalog.len(),
            failed = report
                .values()
                .filter(|o| matches!(o, ConversionOutcome::Failed(_)))
                .count(),
            "Conversion pipeline finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display() {
        assert_eq!(ConversionOutcome::Converted.to_string(), "converted");
        assert_eq!(
            ConversionOutcome::Failed("exit 1".to_string()).to_string(),
            "failed: exit 1"
        );
    }
}
