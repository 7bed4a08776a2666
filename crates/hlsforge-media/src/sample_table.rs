//! MP4 sample table expansion.
//!
//! Sample tables describe how samples (frames) are organized in the file:
//! - stts: sample durations (decoding time)
//! - stss: sync sample table (keyframes)
//! - stsc: sample-to-chunk mapping
//! - stsz: sample sizes
//! - stco/co64: chunk offsets
//! - ctts: composition time offsets (for B-frames)
//!
//! The run-length tables are walked in lock-step by three small cursors
//! ([`ChunkCursor`], [`SyncCursor`], [`CompositionCursor`]) so that expansion
//! is a single O(N) pass over the timing table.

#[cfg(feature = "serialize")]
use serde::Serialize;

/// One `stts` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSample {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// One `stsc` run. `first_chunk` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunk {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// One `ctts` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionOffset {
    pub sample_count: u32,
    pub sample_offset: i32,
}

/// Contents of an `stsz` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSizes {
    /// Every sample has the same size.
    Uniform { size: u32, count: u32 },
    /// Per-sample sizes.
    Explicit(Vec<u32>),
}

impl Default for SampleSizes {
    fn default() -> Self {
        Self::Explicit(Vec::new())
    }
}

impl SampleSizes {
    /// Size of the sample at 0-based `index`, 0 when the table is exhausted.
    pub fn get(&self, index: usize) -> u32 {
        match self {
            Self::Uniform { size, .. } => *size,
            Self::Explicit(sizes) => sizes.get(index).copied().unwrap_or(0),
        }
    }

    /// Number of samples the table describes.
    pub fn count(&self) -> u64 {
        match self {
            Self::Uniform { count, .. } => *count as u64,
            Self::Explicit(sizes) => sizes.len() as u64,
        }
    }

    /// Sum of all declared sample sizes.
    pub fn total(&self) -> u64 {
        match self {
            Self::Uniform { size, count } => *size as u64 * *count as u64,
            Self::Explicit(sizes) => sizes.iter().map(|&s| s as u64).sum(),
        }
    }
}

/// Media type of a sample once attached to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum SampleType {
    Audio,
    Video,
    Data,
}

/// Upper bound on up-front allocation during expansion; larger tracks grow
/// the sample list as they go.
const MAX_PREALLOCATED_SAMPLES: u64 = 1 << 20;

/// One access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
pub struct Sample {
    pub is_keyframe: bool,
    /// Decode timestamp in the track timescale.
    pub dts: u64,
    /// Delta to the next sample in the track timescale.
    pub duration: u32,
    /// Size in bytes.
    pub size: u32,
    /// Absolute byte offset in the source.
    pub offset: u64,
    /// PTS minus DTS in the track timescale.
    pub composition_offset: i32,
}

impl Sample {
    /// Get the presentation timestamp.
    pub fn pts(&self) -> u64 {
        (self.dts as i64 + self.composition_offset as i64).max(0) as u64
    }
}

/// The raw tables of one track, kept after discovery so samples can be
/// expanded on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleTables {
    pub time_to_sample: Vec<TimeToSample>,
    pub sample_sizes: SampleSizes,
    pub sample_to_chunk: Vec<SampleToChunk>,
    pub chunk_offsets: Vec<u64>,
    pub composition_offsets: Option<Vec<CompositionOffset>>,
    /// 1-based sync sample numbers; `None` means every sample is a keyframe.
    pub sync_samples: Option<Vec<u32>>,
}

impl SampleTables {
    /// Create a new sample table builder.
    pub fn builder() -> SampleTableBuilder {
        SampleTableBuilder::new()
    }

    /// Number of samples declared by the timing table.
    pub fn sample_count(&self) -> u64 {
        self.time_to_sample
            .iter()
            .map(|e| e.sample_count as u64)
            .sum()
    }

    /// Sum of `sample_count * sample_delta` over the timing table.
    pub fn total_duration(&self) -> u64 {
        self.time_to_sample
            .iter()
            .map(|e| e.sample_count as u64 * e.sample_delta as u64)
            .sum()
    }

    /// Smallest non-zero sample delta, used for the reported frame rate.
    pub fn min_sample_delta(&self) -> Option<u32> {
        self.time_to_sample
            .iter()
            .filter(|e| e.sample_count > 0 && e.sample_delta > 0)
            .map(|e| e.sample_delta)
            .min()
    }

    /// Expand the tables into a flat, dts-ordered sample list.
    ///
    /// Zero-sized samples are dropped from the output but still advance
    /// chunk, offset and timestamp bookkeeping. Composition offsets are only
    /// read when `with_composition` is set (video tracks).
    pub fn materialize(&self, with_composition: bool) -> Vec<Sample> {
        let declared_sizes = self.sample_sizes.count();
        let expected = self
            .sample_count()
            .min(declared_sizes)
            .min(MAX_PREALLOCATED_SAMPLES);
        let mut samples = Vec::with_capacity(expected as usize);

        let mut chunks = ChunkCursor::new(&self.sample_to_chunk, &self.chunk_offsets);
        let mut sync = SyncCursor::new(self.sync_samples.as_deref());
        let composition_entries = match (with_composition, &self.composition_offsets) {
            (true, Some(entries)) => entries.as_slice(),
            _ => &[],
        };
        let mut composition = CompositionCursor::new(composition_entries);

        let mut dts = 0u64;
        let mut index = 0usize;

        'runs: for run in &self.time_to_sample {
            for _ in 0..run.sample_count {
                if index as u64 >= declared_sizes {
                    tracing::warn!(
                        sample = index,
                        declared = self.sample_count(),
                        "Sample size table exhausted, truncating samples"
                    );
                    break 'runs;
                }
                let Some(offset) = chunks.offset() else {
                    tracing::warn!(
                        sample = index,
                        chunks = self.chunk_offsets.len(),
                        "Chunk offset table exhausted, truncating samples"
                    );
                    break 'runs;
                };

                let size = self.sample_sizes.get(index);
                let is_keyframe = sync.is_keyframe(index as u32 + 1);
                let composition_offset = composition.next_offset();

                if size > 0 {
                    samples.push(Sample {
                        is_keyframe,
                        dts,
                        duration: run.sample_delta,
                        size,
                        offset,
                        composition_offset,
                    });
                }

                chunks.advance(size);
                dts += run.sample_delta as u64;
                index += 1;
            }
        }

        samples
    }
}

/// Walks `stsc`/`stco` to produce each sample's absolute offset.
#[derive(Debug)]
pub struct ChunkCursor<'a> {
    entries: &'a [SampleToChunk],
    chunk_offsets: &'a [u64],
    next_entry: usize,
    samples_per_chunk: u32,
    chunk: usize,
    placed: u32,
    intra_offset: u64,
}

impl<'a> ChunkCursor<'a> {
    pub fn new(entries: &'a [SampleToChunk], chunk_offsets: &'a [u64]) -> Self {
        Self {
            entries,
            chunk_offsets,
            next_entry: 1,
            samples_per_chunk: entries.first().map(|e| e.samples_per_chunk).unwrap_or(0),
            chunk: 0,
            placed: 0,
            intra_offset: 0,
        }
    }

    /// Offset of the next sample, `None` once past the last chunk.
    pub fn offset(&self) -> Option<u64> {
        self.chunk_offsets
            .get(self.chunk)
            .map(|base| base.saturating_add(self.intra_offset))
    }

    /// Account for a placed sample of `size` bytes.
    pub fn advance(&mut self, size: u32) {
        self.placed += 1;
        if self.placed < self.samples_per_chunk {
            self.intra_offset += size as u64;
            return;
        }

        self.placed = 0;
        self.intra_offset = 0;
        self.chunk += 1;

        if let Some(entry) = self.entries.get(self.next_entry) {
            if self.chunk as u64 + 1 >= entry.first_chunk as u64 {
                self.samples_per_chunk = entry.samples_per_chunk;
                self.next_entry += 1;
            }
        }
    }
}

/// Matches sample ordinals against the ascending `stss` list.
#[derive(Debug)]
pub struct SyncCursor<'a> {
    entries: Option<&'a [u32]>,
    pos: usize,
}

impl<'a> SyncCursor<'a> {
    pub fn new(entries: Option<&'a [u32]>) -> Self {
        Self { entries, pos: 0 }
    }

    /// Whether the sample with 1-based `ordinal` is a sync sample. Must be
    /// called with increasing ordinals.
    pub fn is_keyframe(&mut self, ordinal: u32) -> bool {
        let Some(entries) = self.entries else {
            return true;
        };
        if entries.get(self.pos) == Some(&ordinal) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// Walks `ctts` runs, one call per sample.
#[derive(Debug)]
pub struct CompositionCursor<'a> {
    entries: &'a [CompositionOffset],
    entry: usize,
    consumed: u32,
}

impl<'a> CompositionCursor<'a> {
    pub fn new(entries: &'a [CompositionOffset]) -> Self {
        Self {
            entries,
            entry: 0,
            consumed: 0,
        }
    }

    /// Offset for the next sample, 0 once the table is exhausted.
    pub fn next_offset(&mut self) -> i32 {
        while let Some(run) = self.entries.get(self.entry) {
            if self.consumed < run.sample_count {
                self.consumed += 1;
                return run.sample_offset;
            }
            self.entry += 1;
            self.consumed = 0;
        }
        0
    }
}

/// Builder for collecting raw tables from an `stbl` box.
#[derive(Debug, Default)]
pub struct SampleTableBuilder {
    tables: SampleTables,
}

impl SampleTableBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set stts (decoding time to sample) entries.
    pub fn set_stts(&mut self, entries: Vec<TimeToSample>) {
        self.tables.time_to_sample = entries;
    }

    /// Set stss (sync sample) entries.
    pub fn set_sync_samples(&mut self, samples: Vec<u32>) {
        self.tables.sync_samples = Some(samples);
    }

    /// Set stsc (sample to chunk) entries.
    pub fn set_stsc(&mut self, entries: Vec<SampleToChunk>) {
        self.tables.sample_to_chunk = entries;
    }

    /// Set stsz (sample size) data.
    pub fn set_stsz(&mut self, sizes: SampleSizes) {
        self.tables.sample_sizes = sizes;
    }

    /// Set chunk offsets (from stco or co64).
    pub fn set_chunk_offsets(&mut self, offsets: Vec<u64>) {
        self.tables.chunk_offsets = offsets;
    }

    /// Set ctts (composition time to sample) entries.
    pub fn set_ctts(&mut self, entries: Vec<CompositionOffset>) {
        self.tables.composition_offsets = Some(entries);
    }

    pub fn build(self) -> SampleTables {
        self.tables
    }
}
