//! HLS playlist structures.
//!
//! Lines are joined with CRLF and every playlist ends with an empty line.

use super::naming::VariantName;
use crate::segmenter::SegmentList;
use crate::track::{MediaInfo, Mp4Track};

const LINE_END: &str = "\r\n";

/// Protocol version advertised by variant playlists.
pub const HLS_VERSION: u8 = 3;

/// Prefix `name` with `base` when absolute URLs are requested.
fn resolve(base: Option<&str>, name: &str) -> String {
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), name),
        None => name.to_string(),
    }
}

/// Stream variant information.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Playlist URI.
    pub uri: String,
    /// Bandwidth in bits per second.
    pub bandwidth: u64,
    /// Video width and height.
    pub resolution: Option<(u32, u32)>,
    pub frame_rate: Option<f64>,
    /// Codec string (e.g., "avc1.64001f,mp4a.40.2").
    pub codecs: String,
}

impl StreamInfo {
    /// Describe the variant made of `video` and/or `audio`.
    pub fn from_tracks(
        video: Option<&Mp4Track>,
        audio: Option<&Mp4Track>,
        uri: impl Into<String>,
    ) -> Self {
        let kbps = video.map_or(0, |v| v.bitrate) + audio.map_or(0, |a| a.bitrate);
        let codecs = video
            .iter()
            .chain(audio.iter())
            .map(|t| t.codec_description.as_str())
            .collect::<Vec<_>>()
            .join(",");

        Self {
            uri: uri.into(),
            bandwidth: kbps * 1000,
            resolution: video.map(|v| (v.width, v.height)),
            frame_rate: video.map(|v| v.fps),
            codecs,
        }
    }
}

/// Master playlist with one variant per source.
#[derive(Debug, Clone, Default)]
pub struct MasterPlaylist {
    pub streams: Vec<StreamInfo>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the parsed sources of a request. Each source contributes
    /// one variant using its first video and first audio track.
    pub fn from_sources(sources: &[&MediaInfo], base_url: Option<&str>) -> Self {
        let streams = sources
            .iter()
            .enumerate()
            .map(|(file_index, info)| {
                let video = info.first_video();
                let audio = info.first_audio();
                let name = VariantName::new(
                    file_index as u32,
                    video.map(|_| 1),
                    audio.map(|_| 1),
                );
                StreamInfo::from_tracks(video, audio, resolve(base_url, &name.to_string()))
            })
            .collect();

        Self { streams }
    }

    pub fn add_stream(mut self, stream: StreamInfo) -> Self {
        self.streams.push(stream);
        self
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        let mut lines = vec!["#EXTM3U".to_string()];

        for stream in &self.streams {
            let mut inf = format!("#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={}", stream.bandwidth);
            if let Some((width, height)) = stream.resolution {
                inf.push_str(&format!(",RESOLUTION={}x{}", width, height));
            }
            if let Some(frame_rate) = stream.frame_rate {
                inf.push_str(&format!(",FRAME-RATE={:.2}", frame_rate));
            }
            inf.push_str(&format!(",CODECS=\"{}\"", stream.codecs));

            lines.push(inf);
            lines.push(stream.uri.clone());
        }
        lines.push(String::new());

        lines.join(LINE_END)
    }
}

/// A segment entry in a variant playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEntry {
    pub duration_ms: u64,
    pub uri: String,
}

/// VOD variant playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlaylist {
    /// Configured segment length in milliseconds.
    pub target_duration_ms: u64,
    pub version: u8,
    pub segments: Vec<SegmentEntry>,
}

impl MediaPlaylist {
    /// List every segment of `segments` under the names of `variant`.
    pub fn from_segments(
        target_duration_ms: u64,
        variant: &VariantName,
        segments: &SegmentList,
        base_url: Option<&str>,
    ) -> Self {
        let segments = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| SegmentEntry {
                duration_ms: segment.duration_ms,
                uri: resolve(base_url, &variant.segment(i as u32 + 1).to_string()),
            })
            .collect();

        Self {
            target_duration_ms,
            version: HLS_VERSION,
            segments,
        }
    }

    /// `EXT-X-TARGETDURATION`: the target rounded to whole seconds.
    pub fn target_duration_secs(&self) -> u64 {
        (self.target_duration_ms + 500) / 1000
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        let mut lines = vec![
            "#EXTM3U".to_string(),
            format!("#EXT-X-TARGETDURATION:{}", self.target_duration_secs()),
            "#EXT-X-ALLOW-CACHE:YES".to_string(),
            "#EXT-X-PLAYLIST-TYPE:VOD".to_string(),
            format!("#EXT-X-VERSION:{}", self.version),
            "#EXT-X-MEDIA-SEQUENCE:1".to_string(),
        ];

        for segment in &self.segments {
            lines.push(format!("#EXTINF:{:.3}", segment.duration_ms as f64 / 1000.0));
            lines.push(segment.uri.clone());
        }

        lines.push("#EXT-X-ENDLIST".to_string());
        lines.push(String::new());

        lines.join(LINE_END)
    }
}
