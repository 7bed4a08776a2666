//! Media request URLs.
//!
//! A request path below an application looks like
//! `/<folder>/<media>/<file>`, where `<media>` names the source (or several
//! sources in the `prefix,a,b,suffix.csmil` form) and `<file>` is the
//! playlist, segment or metadata being asked for.

use crate::config::HlsMuxerConfig;
use std::collections::HashMap;

/// What a request path asks for, judged by its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    MasterPlaylist,
    VariantPlaylist,
    Segment,
    Metadata,
    Unknown,
}

impl RequestKind {
    pub fn classify(path: &str) -> Self {
        if path.ends_with("master.m3u8") {
            Self::MasterPlaylist
        } else if path.ends_with(".m3u8") {
            Self::VariantPlaylist
        } else if path.ends_with(".ts") {
            Self::Segment
        } else if path.ends_with("metadata") {
            Self::Metadata
        } else {
            Self::Unknown
        }
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, Self::MasterPlaylist | Self::VariantPlaylist)
    }

    /// `type` label of the request duration histogram.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::MasterPlaylist => "master_playlist",
            Self::VariantPlaylist => "playlist",
            Self::Segment => "segment",
            Self::Metadata => "metadata",
            Self::Unknown => "media_unknown",
        }
    }
}

/// Sources and naming context of one media request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMedia {
    /// Folder holding the sources, relative to the application origin.
    pub base_folder: String,
    /// Public folder of the request: `/<app><folder>/<media>`.
    pub full_folder: String,
    /// Source file names, in request order.
    pub sources: Vec<String>,
    /// Requested file name, without query.
    pub filename: String,
    pub params: HashMap<String, String>,
}

impl SourceMedia {
    /// Parse `url`, the request path below application `app_id`
    /// (e.g. `/movies/big.mp4/master.m3u8?token=1`).
    pub fn parse(app_id: &str, url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };

        let (dir, filename) = match path.rfind('/') {
            Some(0) => ("/", &path[1..]),
            Some(i) => (&path[..i], &path[i + 1..]),
            None => (".", path),
        };

        let params = query
            .map(|q| {
                q.split('&')
                    .filter(|p| !p.is_empty())
                    .map(|p| match p.split_once('=') {
                        Some((k, v)) => (k.to_string(), v.to_string()),
                        None => (p.to_string(), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let (base_folder, media) = match dir.rfind('/') {
            Some(i) => (&dir[..i], &dir[i + 1..]),
            None => ("", dir),
        };

        Self {
            base_folder: base_folder.to_string(),
            full_folder: format!("/{app_id}{dir}"),
            sources: expand_sources(media),
            filename: filename.to_string(),
            params,
        }
    }

    /// Whether the folder or a source name walks up with `..`, which would
    /// resolve outside the application origin.
    pub fn escapes_origin(&self) -> bool {
        self.base_folder.split('/').any(|part| part == "..")
            || self
                .sources
                .iter()
                .any(|source| source.split('/').any(|part| part == ".."))
    }

    /// Location of source `index` under `origin_path`.
    pub fn source_path(&self, origin_path: &str, index: usize) -> Option<String> {
        self.sources
            .get(index)
            .map(|file| format!("{}{}/{}", origin_path, self.base_folder, file))
    }

    /// Locations of every source under `origin_path`.
    pub fn source_paths(&self, origin_path: &str) -> Vec<String> {
        (0..self.sources.len())
            .filter_map(|i| self.source_path(origin_path, i))
            .collect()
    }
}

/// Expand a media path component into source file names.
///
/// `movie_,480,720,.mp4.csmil` yields `movie_480.mp4` and `movie_720.mp4`;
/// any other non-empty component is a single source.
fn expand_sources(media: &str) -> Vec<String> {
    if !media.ends_with(".csmil") {
        return if media.is_empty() || media == "." {
            Vec::new()
        } else {
            vec![media.to_string()]
        };
    }

    let parts: Vec<&str> = media.split(',').collect();
    if parts.len() <= 2 {
        return Vec::new();
    }

    let prefix = parts[0];
    let last = parts[parts.len() - 1];
    let suffix = last.rfind('.').map_or(last, |i| &last[..i]);

    parts[1..parts.len() - 1]
        .iter()
        .map(|part| format!("{prefix}{part}{suffix}"))
        .collect()
}

/// Absolute URL of the request folder.
///
/// Without a configured `absolute_base_url` the server's own
/// `http://localhost:<port>` is used.
pub fn absolute_folder_url(muxer: &HlsMuxerConfig, port: u16, full_folder: &str) -> String {
    let base = match muxer.absolute_base_url.as_deref() {
        Some(base) if !base.is_empty() => base.trim_end_matches('/').to_string(),
        _ => format!("http://localhost:{port}"),
    };
    format!("{base}{full_folder}")
}

/// Absolute URL of `name` inside `full_folder`.
pub fn absolute_url(muxer: &HlsMuxerConfig, port: u16, full_folder: &str, name: &str) -> String {
    format!("{}/{}", absolute_folder_url(muxer, port, full_folder), name)
}
