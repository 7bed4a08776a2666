//! Media request handling: metadata, playlists and segments of sources.

use crate::cache::MetadataCache;
use crate::config::{Application, Config};
use crate::discovery::MoovDiscovery;
use crate::source::{self, SourceReader};
use crate::urls::{absolute_folder_url, SourceMedia};
use bytes::Bytes;
use hlsforge_media::{
    build_tracks, BoxDecoder, MasterPlaylist, MediaInfo, MediaPlaylist, Mp4BoxDecoder,
    SegmentData, SegmentList, SegmentName, Segmenter, Track, TsPacketizer, VariantName,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Media(#[from] hlsforge_media::Error),

    #[error("Request does not name any source")]
    NoSources,

    #[error("Unrecognized file name: {0}")]
    BadName(String),

    #[error("File index {index} out of range ({count} sources)")]
    FileIndexOutOfRange { index: u32, count: usize },

    #[error("{0} selects neither a video nor an audio track")]
    NoTrackSelected(String),

    #[error("Source {0} has no segments")]
    NoSegments(String),
}

fn check_origin(media: &SourceMedia) -> Result<()> {
    if media.escapes_origin() {
        tracing::warn!(folder = %media.base_folder, sources = ?media.sources, "Rejected path outside origin");
        return Err(ServiceError::BadName(media.full_folder.clone()));
    }
    Ok(())
}

/// Serves metadata, playlists and segments for media requests.
///
/// Stateless apart from the metadata cache; every request opens its own
/// source reader.
pub struct MediaService {
    config: Arc<Config>,
    cache: Arc<MetadataCache>,
    decoder: Arc<dyn BoxDecoder>,
    discovery: MoovDiscovery,
}

impl MediaService {
    pub fn new(config: Arc<Config>, cache: Arc<MetadataCache>) -> Self {
        let discovery = MoovDiscovery::from_config(&config.parser);
        Self {
            config,
            cache,
            decoder: Arc::new(Mp4BoxDecoder::new()),
            discovery,
        }
    }

    /// Replace the box decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn BoxDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.config.parser.remote_timeout_secs)
    }

    async fn open(&self, source: &str) -> Result<Box<dyn SourceReader>> {
        Ok(source::open_source(source, self.remote_timeout()).await?)
    }

    /// Parsed metadata of `source`, from the cache when possible.
    pub async fn source_metadata(&self, source: &str) -> Result<Arc<MediaInfo>> {
        if let Some(info) = self.cache.get(source) {
            return Ok(info);
        }

        let reader = self.open(source).await?;
        let discovered = self.discovery.discover(reader.as_ref(), self.decoder.as_ref()).await;
        reader.close().await;

        let info = Arc::new(build_tracks(&discovered?));
        tracing::debug!(source, tracks = info.tracks.len(), "Parsed source metadata");

        self.cache.insert(source, Arc::clone(&info));
        Ok(info)
    }

    /// Select tracks by 1-based index within their kind and expand their
    /// sample tables.
    pub async fn source_tracks(
        &self,
        source: &str,
        video: Option<u32>,
        audio: Option<u32>,
    ) -> Result<Vec<Track>> {
        let info = self.source_metadata(source).await?;
        let selected = info.select(video, audio)?;
        Ok(selected.into_iter().map(|t| t.materialize()).collect())
    }

    fn segment_list(&self, app: &Application, tracks: &[Track]) -> SegmentList {
        let started = Instant::now();
        let segmenter = Segmenter::new(app.hls_muxer.segment_length)
            .tolerance(app.hls_muxer.tolerance);
        let segments = segmenter.segment(tracks);
        tracing::debug!(
            segments = segments.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "profiling,segmentation"
        );
        segments
    }

    fn source_path(&self, app: &Application, media: &SourceMedia, file_index: u32) -> Result<String> {
        check_origin(media)?;
        media
            .source_path(&app.origin_path, file_index as usize)
            .ok_or(ServiceError::FileIndexOutOfRange {
                index: file_index,
                count: media.sources.len(),
            })
    }

    /// Master playlist with one variant per source. Fails if any source
    /// fails to parse.
    pub async fn master_playlist(&self, app: &Application, media: &SourceMedia) -> Result<String> {
        check_origin(media)?;
        let paths = media.source_paths(&app.origin_path);
        if paths.is_empty() {
            return Err(ServiceError::NoSources);
        }

        let mut infos = Vec::with_capacity(paths.len());
        for path in &paths {
            infos.push(self.source_metadata(path).await?);
        }

        let base = app.hls_muxer.absolute_index_urls.then(|| {
            absolute_folder_url(&app.hls_muxer, self.config.server.port, &media.full_folder)
        });
        let sources: Vec<&MediaInfo> = infos.iter().map(|i| i.as_ref()).collect();

        Ok(MasterPlaylist::from_sources(&sources, base.as_deref()).render())
    }

    /// Variant playlist named by `filename` (`index-f<n>[-v<n>][-a<n>].m3u8`).
    pub async fn variant_playlist(
        &self,
        app: &Application,
        media: &SourceMedia,
        filename: &str,
    ) -> Result<String> {
        let name =
            VariantName::parse(filename).ok_or_else(|| ServiceError::BadName(filename.to_string()))?;
        if name.video.is_none() && name.audio.is_none() {
            return Err(ServiceError::NoTrackSelected(filename.to_string()));
        }
        let path = self.source_path(app, media, name.file_index)?;

        let tracks = self.source_tracks(&path, name.video, name.audio).await?;
        let segments = self.segment_list(app, &tracks);
        if segments.is_empty() {
            return Err(ServiceError::NoSegments(path));
        }

        let base = app.hls_muxer.absolute_segment_urls.then(|| {
            absolute_folder_url(&app.hls_muxer, self.config.server.port, &media.full_folder)
        });

        Ok(
            MediaPlaylist::from_segments(app.hls_muxer.segment_length, &name, &segments, base.as_deref())
                .render(),
        )
    }

    /// MPEG-TS body of the segment named by `filename`
    /// (`segment-<n>-f<n>[-v<n>][-a<n>].ts`).
    pub async fn segment(
        &self,
        app: &Application,
        media: &SourceMedia,
        filename: &str,
    ) -> Result<Bytes> {
        let (name, index) = SegmentName::parse(filename)
            .and_then(|n| Some((n, n.index()?)))
            .ok_or_else(|| ServiceError::BadName(filename.to_string()))?;
        if name.video.is_none() && name.audio.is_none() {
            return Err(ServiceError::NoTrackSelected(filename.to_string()));
        }
        let path = self.source_path(app, media, name.file_index)?;

        let tracks = self.source_tracks(&path, name.video, name.audio).await?;
        let segments = self.segment_list(app, &tracks);
        let windowed = segments.load_samples(index, &tracks)?;

        tracing::debug!(
            segment = index,
            start_ms = windowed.start_ms,
            samples = windowed.sample_count(),
            "Packetizing segment"
        );

        let ranges = windowed.byte_ranges();
        let reader = self.open(&path).await?;
        let chunks = reader.read_bulk(&ranges).await;
        reader.close().await;

        let data = SegmentData::new(ranges, chunks);
        Ok(TsPacketizer::new().packetize(&windowed, &data)?)
    }

    /// Track metadata of the first source of the request.
    pub async fn metadata_info(&self, app: &Application, media: &SourceMedia) -> Result<Arc<MediaInfo>> {
        check_origin(media)?;
        let path = media
            .source_path(&app.origin_path, 0)
            .ok_or(ServiceError::NoSources)?;
        self.source_metadata(&path).await
    }
}
