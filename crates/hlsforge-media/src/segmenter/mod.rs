//! Keyframe-aligned segmentation.
//!
//! A [`SegmentList`] is computed from the reference track of a source (video,
//! else audio) by [`Segmenter`]. Each request for a segment then windows the
//! materialized samples of every selected track into that segment's
//! `[start_ms, end_ms)` range, see [`SegmentList::load_samples`].

mod builder;
mod window;

pub use builder::Segmenter;
pub use window::{ByteRange, SegmentData, WindowedSample, WindowedSegment, WindowedTrack};

use crate::track::Track;
use crate::{Error, Result};

#[cfg(feature = "serialize")]
use serde::Serialize;

/// One HLS segment of the reference track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
pub struct Segment {
    /// Decode time of the first sample, in reference track ticks.
    pub start: u64,
    /// `start` in milliseconds.
    pub start_ms: u64,
    /// Accumulated sample duration in milliseconds.
    pub duration_ms: u64,
    /// Byte offset of the first sample.
    pub offset: u64,
}

/// Ordered segments of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
pub struct SegmentList {
    pub segments: Vec<Segment>,
}

impl SegmentList {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get a segment by 0-based index.
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Sum of all segment durations in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }

    /// Longest segment in milliseconds.
    pub fn max_duration_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_ms).max().unwrap_or(0)
    }

    /// `[start_ms, end_ms)` of segment `index`; `None` as the end means the
    /// window is open (last segment).
    pub fn window(&self, index: usize) -> Option<(u64, Option<u64>)> {
        let segment = self.segments.get(index)?;
        let end = self.segments.get(index + 1).map(|next| next.start_ms);
        Some((segment.start_ms, end))
    }

    /// Window the samples of `tracks` into segment `index` (0-based).
    pub fn load_samples<'a>(
        &'a self,
        index: usize,
        tracks: &'a [Track],
    ) -> Result<WindowedSegment<'a>> {
        let (start_ms, end_ms) = self.window(index).ok_or(Error::InvalidSegmentIndex {
            index,
            count: self.segments.len(),
        })?;

        Ok(WindowedSegment::new(
            index,
            &self.segments[index],
            start_ms,
            end_ms,
            tracks,
        ))
    }
}

impl<'a> IntoIterator for &'a SegmentList {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start_ms: u64, duration_ms: u64) -> Segment {
        Segment {
            start: start_ms * 90,
            start_ms,
            duration_ms,
            offset: start_ms,
        }
    }

    #[test]
    fn test_segment_list_summary() {
        let list = SegmentList::new(vec![
            segment(0, 10_000),
            segment(10_000, 12_000),
            segment(22_000, 3_000),
        ]);

        assert_eq!(list.len(), 3);
        assert_eq!(list.total_duration_ms(), 25_000);
        assert_eq!(list.max_duration_ms(), 12_000);
        assert_eq!(list.window(0), Some((0, Some(10_000))));
        assert_eq!(list.window(2), Some((22_000, None)));
        assert_eq!(list.window(3), None);
        assert_eq!(list.iter().count(), 3);
    }

    #[test]
    fn test_load_samples_out_of_range() {
        let list = SegmentList::new(vec![segment(0, 1_000)]);
        let err = list.load_samples(1, &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSegmentIndex { index: 1, count: 1 }
        ));
        assert_eq!(SegmentList::default().max_duration_ms(), 0);
    }
}
