//! Integration tests for the conversion pipeline, driven by a fake
//! transcoder so no real encoder is required.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reelcast::library::{Catalog, MANIFEST_NAME};
use reelcast::transcode::{
    ConversionOutcome, ConversionPipeline, EncodeError, Transcoder,
};

/// Transcoder double: records invocations, writes fake HLS output, and fails
/// on demand for selected asset ids.
struct FakeTranscoder {
    calls: Mutex<Vec<String>>,
    fail_ids: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTranscoder {
    fn new() -> Self {
        Self::failing(&[])
    }

    fn failing(ids: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_ids: ids.iter().map(|s| s.to_string()).collect(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn encode(&self, input: &Path, output_dir: &Path) -> Result<(), EncodeError> {
        let id = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap()
            .to_string();
        self.calls.lock().push(id.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        // Hold the slot briefly so overlapping encodes are observable.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_ids.contains(&id) {
            return Err(EncodeError::Failed {
                status: ExitStatus::from_raw(256),
            });
        }

        std::fs::write(
            output_dir.join(MANIFEST_NAME),
            "#EXTM3U\n#EXT-X-ENDLIST\n",
        )
        .unwrap();
        std::fs::write(output_dir.join("segment000.ts"), b"ts").unwrap();
        Ok(())
    }
}

struct PipelineFixture {
    videos_dir: tempfile::TempDir,
    hls_dir: tempfile::TempDir,
    catalog: Arc<Catalog>,
}

impl PipelineFixture {
    fn with_sources(names: &[&str]) -> Self {
        let videos_dir = tempfile::tempdir().unwrap();
        let hls_dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(videos_dir.path().join(name), b"raw video").unwrap();
        }
        let catalog = Arc::new(Catalog::new(hls_dir.path().to_path_buf()));
        Self {
            videos_dir,
            hls_dir,
            catalog,
        }
    }

    fn pipeline(&self, transcoder: Arc<FakeTranscoder>, max_parallel: usize) -> ConversionPipeline {
        ConversionPipeline::new(
            transcoder,
            self.videos_dir.path().to_path_buf(),
            Arc::clone(&self.catalog),
            max_parallel,
        )
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        self.hls_dir.path().join(id).join(MANIFEST_NAME)
    }
}

#[tokio::test]
async fn converts_all_sources_and_registers_collections() {
    let fixture = PipelineFixture::with_sources(&["alpha.mp4", "beta.mkv", "gamma.mp4"]);
    let transcoder = Arc::new(FakeTranscoder::new());

    let report = fixture
        .pipeline(Arc::clone(&transcoder), 4)
        .ensure_all_converted()
        .await
        .unwrap();

    assert_eq!(report.len(), 3);
    for id in ["alpha", "beta", "gamma"] {
        assert_eq!(report[id], ConversionOutcome::Converted);
        assert!(fixture.manifest_path(id).exists());
        assert!(fixture.catalog.contains(id));
    }
    assert_eq!(transcoder.call_count(), 3);
}

#[tokio::test]
async fn second_run_performs_zero_encodes() {
    let fixture = PipelineFixture::with_sources(&["alpha.mp4", "beta.mkv"]);

    let first = Arc::new(FakeTranscoder::new());
    fixture
        .pipeline(Arc::clone(&first), 2)
        .ensure_all_converted()
        .await
        .unwrap();
    assert_eq!(first.call_count(), 2);

    let manifest_before = std::fs::read(fixture.manifest_path("alpha")).unwrap();

    let second = Arc::new(FakeTranscoder::new());
    let report = fixture
        .pipeline(Arc::clone(&second), 2)
        .ensure_all_converted()
        .await
        .unwrap();

    assert_eq!(second.call_count(), 0);
    assert_eq!(report["alpha"], ConversionOutcome::AlreadyConverted);
    assert_eq!(report["beta"], ConversionOutcome::AlreadyConverted);
    // Existing outputs untouched.
    assert_eq!(
        std::fs::read(fixture.manifest_path("alpha")).unwrap(),
        manifest_before
    );
}

#[tokio::test]
async fn one_failed_encode_does_not_block_siblings() {
    let fixture = PipelineFixture::with_sources(&["good1.mp4", "bad.mp4", "good2.mkv"]);
    let transcoder = Arc::new(FakeTranscoder::failing(&["bad"]));

    let report = fixture
        .pipeline(Arc::clone(&transcoder), 4)
        .ensure_all_converted()
        .await
        .unwrap();

    assert_eq!(report["good1"], ConversionOutcome::Converted);
    assert_eq!(report["good2"], ConversionOutcome::Converted);
    assert!(matches!(report["bad"], ConversionOutcome::Failed(_)));

    assert!(fixture.catalog.contains("good1"));
    assert!(fixture.catalog.contains("good2"));
    assert!(!fixture.catalog.contains("bad"));
    assert!(!fixture.manifest_path("bad").exists());
}

#[tokio::test]
async fn unwritable_output_dir_fails_only_that_asset() {
    let fixture = PipelineFixture::with_sources(&["bad.mp4", "good.mp4"]);
    // A plain file where the collection directory should go makes
    // create_dir_all fail for this asset alone.
    std::fs::write(fixture.hls_dir.path().join("bad"), b"in the way").unwrap();
    let transcoder = Arc::new(FakeTranscoder::new());

    let report = fixture
        .pipeline(Arc::clone(&transcoder), 2)
        .ensure_all_converted()
        .await
        .unwrap();

    assert!(matches!(report["bad"], ConversionOutcome::Failed(_)));
    assert_eq!(report["good"], ConversionOutcome::Converted);
    assert!(fixture.catalog.contains("good"));
    assert!(!fixture.catalog.contains("bad"));
    assert_eq!(transcoder.call_count(), 1);
}

#[tokio::test]
async fn converted_collection_outlives_its_source_file() {
    let fixture = PipelineFixture::with_sources(&["alpha.mp4"]);
    // A collection left over from an earlier run whose source was deleted.
    let legacy_dir = fixture.hls_dir.path().join("legacy");
    std::fs::create_dir_all(&legacy_dir).unwrap();
    std::fs::write(legacy_dir.join(MANIFEST_NAME), "#EXTM3U\n#EXT-X-ENDLIST\n").unwrap();
    let transcoder = Arc::new(FakeTranscoder::new());

    let report = fixture
        .pipeline(Arc::clone(&transcoder), 2)
        .ensure_all_converted()
        .await
        .unwrap();

    assert_eq!(report["alpha"], ConversionOutcome::Converted);
    assert!(fixture.catalog.contains("alpha"));
    assert!(fixture.catalog.contains("legacy"));
    // No encode was scheduled for the sourceless collection.
    assert_eq!(transcoder.call_count(), 1);
}

#[tokio::test]
async fn failed_asset_is_retried_on_the_next_run() {
    let fixture = PipelineFixture::with_sources(&["movie.mp4"]);

    let failing = Arc::new(FakeTranscoder::failing(&["movie"]));
    let report = fixture
        .pipeline(Arc::clone(&failing), 1)
        .ensure_all_converted()
        .await
        .unwrap();
    assert!(matches!(report["movie"], ConversionOutcome::Failed(_)));

    let healthy = Arc::new(FakeTranscoder::new());
    let report = fixture
        .pipeline(Arc::clone(&healthy), 1)
        .ensure_all_converted()
        .await
        .unwrap();
    assert_eq!(healthy.call_count(), 1);
    assert_eq!(report["movie"], ConversionOutcome::Converted);
    assert!(fixture.catalog.contains("movie"));
}

#[tokio::test]
async fn fan_out_respects_the_concurrency_bound() {
    let names: Vec<String> = (0..6).map(|i| format!("movie{}.mp4", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let fixture = PipelineFixture::with_sources(&name_refs);
    let transcoder = Arc::new(FakeTranscoder::new());

    fixture
        .pipeline(Arc::clone(&transcoder), 2)
        .ensure_all_converted()
        .await
        .unwrap();

    assert_eq!(transcoder.call_count(), 6);
    assert!(transcoder.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn empty_library_yields_empty_report() {
    let fixture = PipelineFixture::with_sources(&[]);
    let transcoder = Arc::new(FakeTranscoder::new());

    let report = fixture
        .pipeline(Arc::clone(&transcoder), 2)
        .ensure_all_converted()
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(fixture.catalog.is_empty());
}
