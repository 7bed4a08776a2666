use super::SourceReader;
use async_trait::async_trait;
use bytes::Bytes;
use hlsforge_media::{ByteRange, Error, Result};
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Positioned reads over a local file.
pub struct FileReader {
    path: String,
    file: Mutex<Option<File>>,
}

impl FileReader {
    pub async fn open(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).await.map_err(|e| {
            tracing::debug!("Failed to open {}: {}", path, e);
            Error::source_unavailable(path.as_str())
        })?;

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    async fn read_at(file: &mut File, offset: u64, size: usize) -> std::io::Result<Bytes> {
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(Bytes::from(buf))
    }
}

#[async_trait]
impl SourceReader for FileReader {
    fn source_id(&self) -> &str {
        &self.path
    }

    async fn read(&self, offset: u64, size: usize) -> Bytes {
        let mut guard = self.file.lock().await;
        let Some(file) = guard.as_mut() else {
            tracing::warn!("Read on closed source {}", self.path);
            return Bytes::new();
        };

        match Self::read_at(file, offset, size).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Read of {} bytes at {} from {} failed: {}", size, offset, self.path, e);
                Bytes::new()
            }
        }
    }

    async fn read_bulk(&self, ranges: &[ByteRange]) -> Vec<Bytes> {
        let mut out = Vec::with_capacity(ranges.len());
        for range in ranges {
            out.push(self.read(range.offset, range.length as usize).await);
        }
        out
    }

    async fn close(&self) {
        self.file.lock().await.take();
    }
}
