//! Segment list builder.

use super::{Segment, SegmentList};
use crate::time::{rescale, MILLIS};
use crate::track::{Track, TrackKind};
use std::time::Instant;

/// Splits the reference track of a source into keyframe-aligned segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segmenter {
    segment_length_ms: u64,
    tolerance: f64,
}

impl Segmenter {
    /// Default early-cut slack for video tracks.
    pub const DEFAULT_TOLERANCE: f64 = 0.05;

    /// Create a segmenter targeting `segment_length_ms` per segment.
    pub fn new(segment_length_ms: u64) -> Self {
        Self {
            segment_length_ms,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    /// Set the fraction of the target a video segment may fall short by.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.clamp(0.0, 1.0);
        self
    }

    pub fn segment_length_ms(&self) -> u64 {
        self.segment_length_ms
    }

    /// Segment the first video track, else the first audio track.
    pub fn segment(&self, tracks: &[Track]) -> SegmentList {
        let reference = tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .or_else(|| tracks.iter().find(|t| t.kind == TrackKind::Audio));

        match reference {
            Some(track) => SegmentList::new(self.segment_track(track)),
            None => SegmentList::default(),
        }
    }

    /// Boundary threshold in milliseconds for a track of the given kind.
    pub fn threshold_ms(&self, kind: TrackKind) -> u64 {
        match kind {
            TrackKind::Video => {
                (self.segment_length_ms as f64 * (1.0 - self.tolerance)).round() as u64
            }
            TrackKind::Audio => self.segment_length_ms,
        }
    }

    /// Walk the samples of `track`, closing a segment on every keyframe once
    /// the accumulated duration has reached the threshold.
    pub fn segment_track(&self, track: &Track) -> Vec<Segment> {
        let Some(first) = track.samples.first() else {
            return Vec::new();
        };

        let started = Instant::now();
        let timescale = track.timescale;
        let limit = rescale(self.threshold_ms(track.kind), MILLIS, timescale);

        let mut segments = Vec::new();
        let mut partial: u64 = 0;
        let mut start_dts = first.dts;
        let mut start_offset = first.offset;

        for sample in &track.samples {
            if sample.is_keyframe && partial >= limit {
                segments.push(Segment {
                    start: start_dts,
                    start_ms: rescale(start_dts, timescale, MILLIS),
                    duration_ms: rescale(partial, timescale, MILLIS),
                    offset: start_offset,
                });
                partial = 0;
                start_dts = sample.dts;
                start_offset = sample.offset;
            }
            partial += sample.duration as u64;
        }

        if partial > 0 {
            segments.push(Segment {
                start: start_dts,
                start_ms: rescale(start_dts, timescale, MILLIS),
                duration_ms: rescale(partial, timescale, MILLIS),
                offset: start_offset,
            });
        }

        tracing::debug!(
            track_id = track.track_id,
            kind = %track.kind,
            segments = segments.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Segmented track"
        );

        segments
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(10_000)
    }
}
