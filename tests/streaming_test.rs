//! Integration tests for HLS segment serving.

mod common;

use common::TestHarness;

#[tokio::test]
async fn serves_manifest_with_hls_content_type() {
    let h = TestHarness::new();
    h.add_collection("movie");
    let (_h, addr) = h.with_server().await;

    let resp = reqwest::get(format!("http://{addr}/hls/movie/playlist.m3u8"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "application/vnd.apple.mpegurl"
    );
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("#EXTM3U"));
}

#[tokio::test]
async fn serves_segments_with_mpegts_content_type() {
    let h = TestHarness::new();
    h.add_collection("movie");
    let (_h, addr) = h.with_server().await;

    let resp = reqwest::get(format!("http://{addr}/hls/movie/segment000.ts"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "video/MP2T"
    );
    assert_eq!(
        resp.headers()
            .get("cache-control")
            .unwrap()
            .to_str()
            .unwrap(),
        "max-age=31536000, immutable"
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"fake ts payload");
}

#[tokio::test]
async fn traversal_attempts_are_rejected() {
    let h = TestHarness::new();
    h.add_collection("movie");
    let (_h, addr) = h.with_server().await;

    // Encoded slashes keep the attack inside one path segment; axum decodes
    // them before our resolver sees the name.
    let resp = reqwest::get(format!(
        "http://{addr}/hls/movie/..%2F..%2Fetc%2Fpasswd"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = reqwest::get(format!("http://{addr}/hls/..%2Fmovie/playlist.m3u8"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn missing_segment_is_not_found() {
    let h = TestHarness::new();
    h.add_collection("movie");
    let (_h, addr) = h.with_server().await;

    let resp = reqwest::get(format!("http://{addr}/hls/movie/segment999.ts"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = reqwest::get(format!("http://{addr}/hls/unknown/playlist.m3u8"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
