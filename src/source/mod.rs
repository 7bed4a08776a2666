//! Random-access readers over media sources.
//!
//! A source is either a local file or an `http(s)://` URL. Reads never fail:
//! a transport problem is logged and comes back as a short or empty buffer,
//! which callers treat as "not available yet".

mod file;
mod http;

pub use file::FileReader;
pub use http::HttpReader;

use async_trait::async_trait;
use bytes::Bytes;
use hlsforge_media::{ByteRange, Result};
use std::time::Duration;

/// Timeout of a single remote range request.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Path or URL this reader was opened on.
    fn source_id(&self) -> &str;

    /// Read up to `size` bytes starting at `offset`.
    async fn read(&self, offset: u64, size: usize) -> Bytes;

    /// Read each of `ranges`, returning one buffer per range in order.
    async fn read_bulk(&self, ranges: &[ByteRange]) -> Vec<Bytes>;

    /// Release the underlying file handle or connection pool.
    async fn close(&self);
}

/// Whether `source` is read over HTTP.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Open the reader matching `source`.
///
/// Local files are opened eagerly so a missing file is reported as
/// `SourceUnavailable`; remote sources are only contacted on read.
pub async fn open_source(source: &str, remote_timeout: Duration) -> Result<Box<dyn SourceReader>> {
    if is_remote(source) {
        Ok(Box::new(HttpReader::new(source, remote_timeout)))
    } else {
        Ok(Box::new(FileReader::open(source).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsforge_media::Error;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://origin/movie.mp4"));
        assert!(is_remote("https://origin/movie.mp4"));
        assert!(!is_remote("./media/movie.mp4"));
        assert!(!is_remote("/srv/http/movie.mp4"));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = match open_source("/nonexistent/movie.mp4", DEFAULT_REMOTE_TIMEOUT).await {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::SourceUnavailable { ref source_id } if source_id == "/nonexistent/movie.mp4"));
    }

    #[tokio::test]
    async fn test_open_remote_is_lazy() {
        let reader = open_source("http://127.0.0.1:1/movie.mp4", DEFAULT_REMOTE_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(reader.source_id(), "http://127.0.0.1:1/movie.mp4");
    }
}
