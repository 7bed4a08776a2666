//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which writes fixture MP4 files into a temporary
//! origin directory and builds an [`AppContext`] whose `hls` application
//! serves from it. The [`TestHarness::with_server`] constructor starts Axum on
//! a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use hlsforge::config::{ApplicationConfig, Config, HlsMuxerOverrides};
use hlsforge::server::{create_router, AppContext};
use hlsforge_media::mp4::fixtures::av_fixture;
use tempfile::TempDir;

/// Length in seconds of the default `movies/movie.mp4` fixture.
pub const MOVIE_SECONDS: u32 = 30;

pub struct TestHarness {
    pub ctx: AppContext,
    pub origin: TempDir,
}

impl TestHarness {
    /// Harness with `movies/movie.mp4` in the origin and default settings.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Harness with a custom configuration. The `hls` application is pointed
    /// at the temporary origin, keeping any muxer overrides it declares.
    pub fn with_config(mut config: Config) -> Self {
        let origin = tempfile::tempdir().expect("failed to create origin dir");
        std::fs::create_dir_all(origin.path().join("movies")).expect("failed to create folder");
        std::fs::write(
            origin.path().join("movies/movie.mp4"),
            av_fixture(MOVIE_SECONDS),
        )
        .expect("failed to write fixture");

        let hls_muxer = config
            .applications
            .get("hls")
            .map(|app| app.hls_muxer.clone())
            .unwrap_or_else(HlsMuxerOverrides::default);
        config.applications.insert(
            "hls".to_string(),
            ApplicationConfig {
                origin_path: origin.path().to_string_lossy().into_owned(),
                hls_muxer,
            },
        );

        Self {
            ctx: AppContext::new(config),
            origin,
        }
    }

    /// Write an extra file into the origin.
    pub fn add_source(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.origin.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create folder");
        }
        std::fs::write(&path, content).expect("failed to write source");
        path
    }

    /// Path of `relative` as the service sees it.
    pub fn source_path(&self, relative: &str) -> String {
        format!("{}/{}", self.origin.path().to_string_lossy(), relative)
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}

/// Split a transport stream into 188-byte packets, checking sync bytes.
pub fn ts_packets(body: &[u8]) -> Vec<&[u8]> {
    assert_eq!(body.len() % 188, 0, "TS body is not packet aligned");
    body.chunks(188)
        .inspect(|p| assert_eq!(p[0], 0x47, "missing sync byte"))
        .collect()
}

/// PID of a transport stream packet.
pub fn pid(packet: &[u8]) -> u16 {
    (((packet[1] & 0x1F) as u16) << 8) | packet[2] as u16
}
