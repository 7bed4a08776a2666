//! Per-request segment windowing.

use super::Segment;
use crate::sample_table::{Sample, SampleType};
use crate::time::{rescale, rescale_signed, MILLIS};
use crate::track::{Track, TrackKind};
use bytes::Bytes;

/// A sample selected into a segment window, stamped with its track context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowedSample<'a> {
    pub sample: &'a Sample,
    pub sample_type: SampleType,
    pub timescale: u32,
    /// Decode time in milliseconds.
    pub tdts: u64,
    /// Composition offset in milliseconds, when the sample has one.
    pub tcomposition: Option<i64>,
}

/// The samples of one track that fall inside a segment window.
#[derive(Debug, Clone)]
pub struct WindowedTrack<'a> {
    pub track: &'a Track,
    pub samples: Vec<WindowedSample<'a>>,
}

/// A segment with the samples of every selected track.
#[derive(Debug, Clone)]
pub struct WindowedSegment<'a> {
    /// 0-based index in the segment list.
    pub index: usize,
    pub segment: &'a Segment,
    pub start_ms: u64,
    /// `None` for the last segment.
    pub end_ms: Option<u64>,
    pub tracks: Vec<WindowedTrack<'a>>,
}

impl<'a> WindowedSegment<'a> {
    pub(super) fn new(
        index: usize,
        segment: &'a Segment,
        start_ms: u64,
        end_ms: Option<u64>,
        tracks: &'a [Track],
    ) -> Self {
        let tracks = tracks
            .iter()
            .map(|track| WindowedTrack {
                track,
                samples: window_track(track, index, start_ms, end_ms),
            })
            .collect();

        Self {
            index,
            segment,
            start_ms,
            end_ms,
            tracks,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.tracks.iter().map(|t| t.samples.len()).sum()
    }

    /// Total payload bytes of all windowed samples.
    pub fn data_size(&self) -> u64 {
        self.samples().map(|s| s.sample.size as u64).sum()
    }

    fn samples(&self) -> impl Iterator<Item = &WindowedSample<'a>> {
        self.tracks.iter().flat_map(|t| t.samples.iter())
    }

    /// Byte ranges covering every windowed sample, sorted by offset with
    /// adjacent and overlapping ranges merged.
    pub fn byte_ranges(&self) -> Vec<ByteRange> {
        let mut ranges: Vec<ByteRange> = self
            .samples()
            .map(|s| ByteRange {
                offset: s.sample.offset,
                length: s.sample.size as u64,
            })
            .collect();
        ranges.sort_unstable_by_key(|r| r.offset);

        let mut merged: Vec<ByteRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            if let Some(last) = merged.last_mut() {
                if range.offset <= last.end() {
                    last.length = last.length.max(range.end() - last.offset);
                    continue;
                }
            }
            merged.push(range);
        }
        merged
    }
}

fn window_track<'a>(
    track: &'a Track,
    index: usize,
    start_ms: u64,
    end_ms: Option<u64>,
) -> Vec<WindowedSample<'a>> {
    let sample_type = match track.kind {
        TrackKind::Video => SampleType::Video,
        TrackKind::Audio => SampleType::Audio,
    };
    let timescale = track.timescale;

    track
        .samples
        .iter()
        .filter_map(|sample| {
            let tdts = rescale(sample.dts, timescale, MILLIS);
            let after_start = index == 0 || tdts >= start_ms;
            let before_end = end_ms.map_or(true, |end| tdts < end);
            if !(after_start && before_end) {
                return None;
            }
            let tcomposition = (sample.composition_offset != 0).then(|| {
                rescale_signed(sample.composition_offset as i64, timescale, MILLIS)
            });
            Some(WindowedSample {
                sample,
                sample_type,
                timescale,
                tdts,
                tcomposition,
            })
        })
        .collect()
}

/// A contiguous byte range of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    pub fn contains(&self, offset: u64, length: u64) -> bool {
        offset >= self.offset && offset.saturating_add(length) <= self.end()
    }
}

/// Payload bytes read for a set of byte ranges.
#[derive(Debug, Clone, Default)]
pub struct SegmentData {
    ranges: Vec<ByteRange>,
    chunks: Vec<Bytes>,
}

impl SegmentData {
    /// Pair each range with its bytes. `ranges` must be sorted and
    /// non-overlapping, as returned by [`WindowedSegment::byte_ranges`].
    pub fn new(ranges: Vec<ByteRange>, chunks: Vec<Bytes>) -> Self {
        Self { ranges, chunks }
    }

    /// The bytes of `sample`, or `None` if they were not read (or came
    /// back short).
    pub fn sample_data(&self, sample: &Sample) -> Option<&[u8]> {
        let idx = self
            .ranges
            .partition_point(|r| r.offset <= sample.offset)
            .checked_sub(1)?;
        let range = self.ranges.get(idx)?;
        if !range.contains(sample.offset, sample.size as u64) {
            return None;
        }
        let start = (sample.offset - range.offset) as usize;
        self.chunks
            .get(idx)?
            .get(start..start + sample.size as usize)
    }

    pub fn total_len(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }
}
