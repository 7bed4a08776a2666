//! MP4 atom definitions and decoded leaf payloads.

use super::codec_config::{AvcConfig, EsDescriptor, HevcConfig};
use crate::sample_table::{CompositionOffset, SampleSizes, SampleToChunk, TimeToSample};

/// Four-character atom type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const MVEX: Self = Self(*b"mvex");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const EDTS: Self = Self(*b"edts");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const DINF: Self = Self(*b"dinf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const STTS: Self = Self(*b"stts");
    pub const STSS: Self = Self(*b"stss");
    pub const STSC: Self = Self(*b"stsc");
    pub const STSZ: Self = Self(*b"stsz");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");
    pub const CTTS: Self = Self(*b"ctts");
    pub const FREE: Self = Self(*b"free");
    pub const UDTA: Self = Self(*b"udta");

    // Sample entries
    pub const AVC1: Self = Self(*b"avc1");
    pub const AVC3: Self = Self(*b"avc3");
    pub const HVC1: Self = Self(*b"hvc1");
    pub const HEV1: Self = Self(*b"hev1");
    pub const VP08: Self = Self(*b"vp08");
    pub const VP09: Self = Self(*b"vp09");
    pub const MP4A: Self = Self(*b"mp4a");
    pub const AC3: Self = Self(*b"ac-3");
    pub const EC3: Self = Self(*b"ec-3");
    pub const OPUS: Self = Self(*b"Opus");

    // Codec configuration
    pub const AVCC: Self = Self(*b"avcC");
    pub const HVCC: Self = Self(*b"hvcC");
    pub const ESDS: Self = Self(*b"esds");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Check if atoms of this type contain child atoms.
    pub fn is_container(&self) -> bool {
        matches!(
            *self,
            Self::MOOV
                | Self::TRAK
                | Self::MDIA
                | Self::MINF
                | Self::DINF
                | Self::STBL
                | Self::EDTS
                | Self::UDTA
                | Self::MVEX
        )
    }

    pub fn is_visual_entry(&self) -> bool {
        matches!(
            *self,
            Self::AVC1 | Self::AVC3 | Self::HVC1 | Self::HEV1 | Self::VP08 | Self::VP09
        )
    }

    pub fn is_audio_entry(&self) -> bool {
        matches!(*self, Self::MP4A | Self::AC3 | Self::EC3 | Self::OPUS)
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handler type for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    Video,
    Audio,
    Hint,
    Meta,
    Text,
    Unknown([u8; 4]),
}

impl HandlerType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"vide" => Self::Video,
            b"soun" => Self::Audio,
            b"hint" => Self::Hint,
            b"meta" => Self::Meta,
            b"text" => Self::Text,
            _ => Self::Unknown(bytes),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio)
    }
}

/// Track header (`tkhd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHeader {
    pub track_id: u32,
    pub width: u32,
    pub height: u32,
}

/// Media header (`mdhd`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHeader {
    pub timescale: u32,
    /// Duration in `timescale` ticks.
    pub duration: u64,
    /// ISO-639-2/T language code.
    pub language: String,
}

/// Codec-specific part of a sample entry.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleEntryKind {
    Visual {
        width: u16,
        height: u16,
        avc: Option<AvcConfig>,
        hevc: Option<HevcConfig>,
    },
    Audio {
        channel_count: u16,
        sample_size: u16,
        sample_rate: u32,
        esds: Option<EsDescriptor>,
    },
}

/// One entry of an `stsd` box.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEntry {
    pub format: AtomType,
    pub kind: SampleEntryKind,
}

impl SampleEntry {
    pub fn avc_config(&self) -> Option<&AvcConfig> {
        match &self.kind {
            SampleEntryKind::Visual { avc, .. } => avc.as_ref(),
            _ => None,
        }
    }

    pub fn hevc_config(&self) -> Option<&HevcConfig> {
        match &self.kind {
            SampleEntryKind::Visual { hevc, .. } => hevc.as_ref(),
            _ => None,
        }
    }

    pub fn es_descriptor(&self) -> Option<&EsDescriptor> {
        match &self.kind {
            SampleEntryKind::Audio { esds, .. } => esds.as_ref(),
            _ => None,
        }
    }
}

/// Decoded contents of a leaf atom.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoxPayload {
    /// Container atoms and atoms this decoder does not interpret.
    #[default]
    None,
    TrackHeader(TrackHeader),
    MediaHeader(MediaHeader),
    Handler(HandlerType),
    SampleDescriptions(Vec<SampleEntry>),
    TimeToSample(Vec<TimeToSample>),
    SyncSamples(Vec<u32>),
    SampleSizes(SampleSizes),
    SampleToChunk(Vec<SampleToChunk>),
    ChunkOffsets(Vec<u64>),
    CompositionOffsets(Vec<CompositionOffset>),
}

/// Decode a packed ISO-639-2/T language code from `mdhd`.
pub fn decode_language(packed: u16) -> String {
    let chars = [
        ((packed >> 10) & 0x1F) as u8,
        ((packed >> 5) & 0x1F) as u8,
        (packed & 0x1F) as u8,
    ];
    if chars.iter().any(|&c| c == 0) {
        return "und".to_string();
    }
    chars.iter().map(|&c| (c + 0x60) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_type_display() {
        assert_eq!(AtomType::MOOV.to_string(), "moov");
        assert_eq!(AtomType::AC3.as_str(), "ac-3");
        assert_eq!(AtomType([0xFF, 0, 0, 0]).as_str(), "????");
    }

    #[test]
    fn test_containers() {
        assert!(AtomType::MOOV.is_container());
        assert!(AtomType::EDTS.is_container());
        assert!(!AtomType::STSD.is_container());
        assert!(!AtomType::MDAT.is_container());
    }

    #[test]
    fn test_decode_language() {
        assert_eq!(decode_language(0x55C4), "und");
        assert_eq!(decode_language(0x15C7), "eng");
        assert_eq!(decode_language(0), "und");
    }

    #[test]
    fn test_handler_type() {
        assert!(HandlerType::from_bytes(*b"vide").is_video());
        assert!(HandlerType::from_bytes(*b"soun").is_audio());
        assert_eq!(
            HandlerType::from_bytes(*b"subt"),
            HandlerType::Unknown(*b"subt")
        );
    }
}
