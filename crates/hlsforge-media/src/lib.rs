//! hlsforge-media: MP4 metadata, segmentation and MPEG-TS packetization
//!
//! This crate is the synchronous core of hlsforge. It works on byte slices
//! only; reading sources is left to the caller.
//!
//! # Modules
//!
//! - `mp4` - MP4 box tree decoding (moov, sample tables, avcC/hvcC/esds)
//! - `track` - Normalized track and codec model built from the box tree
//! - `sample_table` - Expansion of run-length sample tables into samples
//! - `segmenter` - Keyframe-aligned segment lists and per-segment windowing
//! - `hls` - HLS playlist generation (m3u8) and file naming
//! - `ts` - MPEG transport stream packetization of a segment
//!
//! # Architecture
//!
//! Requests are served without any preprocessing of the source:
//!
//! 1. The head of the file is decoded until a complete moov is found
//! 2. Tracks are built from the moov (codec, timing, bitrate, extra data)
//! 3. Sample tables are expanded for the selected tracks
//! 4. The reference track is split into segments on keyframes
//! 5. For a segment request, samples are windowed to the segment, their
//!    byte ranges are read from the source and packetized into MPEG-TS

pub mod error;
pub mod hls;
pub mod mp4;
pub mod sample_table;
pub mod segmenter;
pub mod time;
pub mod track;
pub mod ts;

pub use error::{Error, Result};
pub use hls::{MasterPlaylist, MediaPlaylist, SegmentName, VariantName};
pub use mp4::{BoxDecoder, DecodedBoxes, Mp4BoxDecoder};
pub use sample_table::{Sample, SampleTables, SampleType};
pub use segmenter::{ByteRange, Segment, SegmentData, SegmentList, Segmenter, WindowedSegment};
pub use time::rescale;
pub use track::{build_tracks, CodecId, MediaInfo, Mp4Track, Track, TrackKind};
pub use ts::TsPacketizer;
