//! End-to-end tests over HTTP against a server started on a random port.

mod common;

use common::{pid, ts_packets, TestHarness};
use hlsforge::config::{Config, HlsMuxerOverrides};

async fn get(url: String) -> reqwest::Response {
    reqwest::get(url).await.expect("request failed")
}

#[tokio::test]
async fn health_endpoint() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = get(format!("http://{addr}/health")).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn master_playlist_lists_variant() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/master.m3u8")).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/x-mpegURL"
    );
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("#EXTM3U\r\n"));
    assert!(body.contains("RESOLUTION=1280x720"));
    assert!(body.contains("FRAME-RATE=25.00"));
    assert!(body.contains(r#"CODECS="avc1.64001f,mp4a.40.2""#));
    assert!(body.contains("\r\nindex-f0-v1-a1.m3u8\r\n"));
}

#[tokio::test]
async fn variant_playlist_lists_segments() {
    let (_harness, addr) = TestHarness::with_server().await;
    let body = get(format!("http://{addr}/hls/movies/movie.mp4/index-f0-v1-a1.m3u8"))
        .await
        .text()
        .await
        .unwrap();

    assert!(body.contains("#EXT-X-TARGETDURATION:10\r\n"));
    assert_eq!(body.matches("#EXTINF:10.000").count(), 3);
    assert!(body.contains("segment-1-f0-v1-a1.ts"));
    assert!(body.contains("segment-3-f0-v1-a1.ts"));
    assert!(!body.contains("segment-4-f0-v1-a1.ts"));
    assert!(body.contains("#EXT-X-ENDLIST"));
}

#[tokio::test]
async fn segment_is_transport_stream() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/segment-1-f0-v1-a1.ts")).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"].to_str().unwrap(), "video/MP2T");
    let body = resp.bytes().await.unwrap();
    let packets = ts_packets(&body);
    assert_eq!(pid(packets[0]), 0x0000);
    assert_eq!(pid(packets[1]), 0x1000);
    assert!(packets.iter().any(|p| pid(p) == 0x0100));
    assert!(packets.iter().any(|p| pid(p) == 0x0101));
}

#[tokio::test]
async fn video_only_segment_has_no_audio_pid() {
    let (_harness, addr) = TestHarness::with_server().await;
    let body = get(format!("http://{addr}/hls/movies/movie.mp4/segment-2-f0-v1.ts"))
        .await
        .bytes()
        .await
        .unwrap();

    let packets = ts_packets(&body);
    assert!(packets.iter().any(|p| pid(p) == 0x0100));
    assert!(!packets.iter().any(|p| pid(p) == 0x0101));
}

#[tokio::test]
async fn metadata_describes_tracks() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/metadata")).await;

    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["tracks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn routing_errors() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = get(format!("http://{addr}/vod/movies/movie.mp4/master.m3u8")).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "unknown app");

    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/poster.jpg")).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "unknown request");

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/hls/movies/movie.mp4/master.m3u8"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
}

#[tokio::test]
async fn media_errors_map_to_status_codes() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = get(format!("http://{addr}/hls/movies/missing.mp4/master.m3u8")).await;
    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "source_unavailable");

    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/index-f0-v2-a1.m3u8")).await;
    assert_eq!(resp.status(), 501);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "track_not_found");

    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/segment-99-f0-v1-a1.ts")).await;
    assert_eq!(resp.status(), 501);

    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/segment-0-f0-v1-a1.ts")).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn cache_stats_and_invalidation() {
    let (harness, addr) = TestHarness::with_server().await;
    let master = format!("http://{addr}/hls/movies/movie.mp4/master.m3u8");

    get(master.clone()).await;
    get(master.clone()).await;

    let stats: serde_json::Value = get(format!("http://{addr}/api/cache/stats"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);

    let key = harness.source_path("movies/movie.mp4");
    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/cache/invalidate"))
        .query(&[("key", key.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(harness.ctx.service.cache().is_empty());

    get(master).await;
    assert_eq!(harness.ctx.service.cache().len(), 1);
    let resp = get(format!("http://{addr}/api/cache/invalidate")).await;
    assert_eq!(resp.status(), 200);
    assert!(harness.ctx.service.cache().is_empty());
}

#[tokio::test]
async fn absolute_urls_use_configured_base() {
    let mut config = Config::default();
    config.hls_muxer.absolute_base_url = Some("https://cdn.example.com/".to_string());
    config.applications.get_mut("hls").unwrap().hls_muxer = HlsMuxerOverrides {
        absolute_index_urls: Some(true),
        absolute_segment_urls: Some(true),
        ..Default::default()
    };
    let (_harness, addr) = TestHarness::with_server_config(config).await;

    let master = get(format!("http://{addr}/hls/movies/movie.mp4/master.m3u8"))
        .await
        .text()
        .await
        .unwrap();
    assert!(master.contains("https://cdn.example.com/hls/movies/movie.mp4/index-f0-v1-a1.m3u8"));

    let variant = get(format!("http://{addr}/hls/movies/movie.mp4/index-f0-v1-a1.m3u8"))
        .await
        .text()
        .await
        .unwrap();
    assert!(variant.contains("https://cdn.example.com/hls/movies/movie.mp4/segment-1-f0-v1-a1.ts"));
}

#[tokio::test]
async fn application_segment_length_override() {
    let mut config = Config::default();
    config.applications.get_mut("hls").unwrap().hls_muxer.segment_length = Some(4000);
    let (_harness, addr) = TestHarness::with_server_config(config).await;

    let variant = get(format!("http://{addr}/hls/movies/movie.mp4/index-f0-v1-a1.m3u8"))
        .await
        .text()
        .await
        .unwrap();
    assert!(variant.contains("#EXT-X-TARGETDURATION:4\r\n"));
    assert_eq!(variant.matches("#EXTINF:4.000").count(), 7);
    assert_eq!(variant.matches("#EXTINF:").count(), 8);
}

#[tokio::test]
async fn response_headers() {
    let mut config = Config::default();
    config.server.cache_control.playlist_max_age = Some(0);
    config.server.cache_control.segment_max_age = Some(3600);
    let (_harness, addr) = TestHarness::with_server_config(config).await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/hls/movies/movie.mp4/master.m3u8"))
        .header("origin", "https://player.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["cache-control"], "no-cache");
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");

    let resp = get(format!("http://{addr}/hls/movies/movie.mp4/segment-1-f0-v1-a1.ts")).await;
    assert_eq!(resp.headers()["cache-control"], "public, max-age=3600");
}
