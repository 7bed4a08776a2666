//! Variant and segment file names.
//!
//! Players request `index-f<file>[-v<n>][-a<n>].m3u8` for a variant playlist
//! and `segment-<n>-f<file>[-v<n>][-a<n>].ts` for a segment, where `<file>`
//! is the 0-based source index of a multi-source request, `-v`/`-a` are
//! 1-based track indices and the segment number is 1-based.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn variant_re() -> Option<&'static Regex> {
    static VARIANT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    VARIANT_RE
        .get_or_init(|| Regex::new(r"index-f(\d+)(-v(\d+))?(-a(\d+))?\.m3u8").ok())
        .as_ref()
}

fn segment_re() -> Option<&'static Regex> {
    static SEGMENT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    SEGMENT_RE
        .get_or_init(|| Regex::new(r"segment-(\d+)-f(\d+)(-v(\d+))?(-a(\d+))?\.ts").ok())
        .as_ref()
}

fn group(captures: &regex::Captures<'_>, index: usize) -> Option<u32> {
    captures.get(index).and_then(|m| m.as_str().parse().ok())
}

fn write_tracks(f: &mut fmt::Formatter<'_>, video: Option<u32>, audio: Option<u32>) -> fmt::Result {
    if let Some(v) = video {
        write!(f, "-v{}", v)?;
    }
    if let Some(a) = audio {
        write!(f, "-a{}", a)?;
    }
    Ok(())
}

/// A variant playlist name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantName {
    pub file_index: u32,
    pub video: Option<u32>,
    pub audio: Option<u32>,
}

impl VariantName {
    pub fn new(file_index: u32, video: Option<u32>, audio: Option<u32>) -> Self {
        Self {
            file_index,
            video,
            audio,
        }
    }

    /// Parse a variant name. The name may carry a path or query around it.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = variant_re()?.captures(name)?;
        Some(Self {
            file_index: group(&caps, 1)?,
            video: group(&caps, 3),
            audio: group(&caps, 5),
        })
    }

    /// Name of segment `number` (1-based) of this variant.
    pub fn segment(&self, number: u32) -> SegmentName {
        SegmentName {
            number,
            file_index: self.file_index,
            video: self.video,
            audio: self.audio,
        }
    }
}

impl fmt::Display for VariantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index-f{}", self.file_index)?;
        write_tracks(f, self.video, self.audio)?;
        f.write_str(".m3u8")
    }
}

/// A segment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentName {
    /// 1-based segment number.
    pub number: u32,
    pub file_index: u32,
    pub video: Option<u32>,
    pub audio: Option<u32>,
}

impl SegmentName {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = segment_re()?.captures(name)?;
        Some(Self {
            number: group(&caps, 1)?,
            file_index: group(&caps, 2)?,
            video: group(&caps, 4),
            audio: group(&caps, 6),
        })
    }

    /// 0-based index into the segment list. `None` for segment 0.
    pub fn index(&self) -> Option<usize> {
        (self.number as usize).checked_sub(1)
    }

    pub fn variant(&self) -> VariantName {
        VariantName::new(self.file_index, self.video, self.audio)
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment-{}-f{}", self.number, self.file_index)?;
        write_tracks(f, self.video, self.audio)?;
        f.write_str(".ts")
    }
}
