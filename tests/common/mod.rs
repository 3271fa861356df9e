//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates temp video/HLS directories, a
//! catalog, and a full [`AppContext`]. The [`with_server`] constructor starts
//! Axum on a random port for HTTP-level testing.

use std::net::SocketAddr;
use std::sync::Arc;

use reelcast::config::Config;
use reelcast::library::{Catalog, MANIFEST_NAME};
use reelcast::server::{create_router, AppContext};
use tempfile::TempDir;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by
/// temporary storage directories.
pub struct TestHarness {
    pub ctx: AppContext,
    pub videos_dir: TempDir,
    pub hls_dir: TempDir,
}

#[allow(dead_code)]
impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration; storage locations
    /// are replaced with temp directories.
    pub fn with_config(mut config: Config) -> Self {
        let videos_dir = tempfile::tempdir().expect("failed to create videos dir");
        let hls_dir = tempfile::tempdir().expect("failed to create hls dir");
        config.library.videos_dir = videos_dir.path().to_path_buf();
        config.library.hls_dir = hls_dir.path().to_path_buf();

        let catalog = Arc::new(Catalog::new(config.library.hls_dir.clone()));
        let ctx = AppContext::new(config, catalog);

        Self {
            ctx,
            videos_dir,
            hls_dir,
        }
    }

    /// Harness with a given channel capacity.
    pub fn with_capacity(max_channels: usize) -> Self {
        let mut config = Config::default();
        config.channels.max_channels = max_channels;
        Self::with_config(config)
    }

    /// Materialize a converted collection on disk and register it.
    pub fn add_collection(&self, id: &str) {
        let dir = self.ctx.catalog.collection_dir(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(MANIFEST_NAME),
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ENDLIST\n",
        )
        .unwrap();
        std::fs::write(dir.join("segment000.ts"), b"fake ts payload").unwrap();
        self.ctx.catalog.register(id);
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (self, addr)
    }
}
