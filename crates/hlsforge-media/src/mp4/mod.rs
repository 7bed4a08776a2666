//! MP4 box tree.
//!
//! [`BoxDecoder`] turns a byte buffer holding the head of a file into a tree
//! of [`Mp4Box`] plus one [`ProvisionalTrack`] per recognised `trak`. The
//! buffer may stop anywhere: a box whose declared size runs past the end is
//! kept with `is_complete == false` and is not descended into, which is how
//! discovery decides whether to read more.

mod atoms;
mod codec_config;
mod decoder;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod sps;

pub use atoms::{
    decode_language, AtomType, BoxPayload, HandlerType, MediaHeader, SampleEntry,
    SampleEntryKind, TrackHeader,
};
pub use codec_config::{AvcConfig, Descriptor, EsDescriptor, HevcConfig, HevcNalArray};
pub use decoder::Mp4BoxDecoder;
pub use sps::{parse_sps, remove_emulation_prevention, SpsInfo};

use crate::track::TrackKind;
use crate::Result;
use std::collections::HashMap;

/// A decoded box.
#[derive(Debug, Clone, PartialEq)]
pub struct Mp4Box {
    pub box_type: AtomType,
    /// Declared size including the header.
    pub size: u64,
    /// Offset of the box header from the start of the decoded buffer.
    pub offset: u64,
    pub header_size: u8,
    /// Whether the whole declared extent was present in the buffer.
    pub is_complete: bool,
    pub payload: BoxPayload,
    pub children: Vec<Mp4Box>,
}

impl Mp4Box {
    /// First direct child of the given type.
    pub fn child(&self, box_type: AtomType) -> Option<&Mp4Box> {
        self.children.iter().find(|b| b.box_type == box_type)
    }

    /// All direct children of the given type.
    pub fn children_of(&self, box_type: AtomType) -> impl Iterator<Item = &Mp4Box> {
        self.children.iter().filter(move |b| b.box_type == box_type)
    }

    /// Depth-first search below this box (not including itself).
    pub fn find(&self, box_type: AtomType) -> Option<&Mp4Box> {
        find_box(&self.children, box_type)
    }
}

/// Depth-first search for the first box of `box_type`.
pub fn find_box(boxes: &[Mp4Box], box_type: AtomType) -> Option<&Mp4Box> {
    for b in boxes {
        if b.box_type == box_type {
            return Some(b);
        }
        if let Some(found) = find_box(&b.children, box_type) {
            return Some(found);
        }
    }
    None
}

/// Per-track record produced alongside the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalTrack {
    pub track_id: u32,
    pub kind: TrackKind,
    /// MIME type with RFC 6381 codec parameter, e.g. `video/mp4; codecs="avc1"`.
    pub mime_type: String,
    /// The first sample entry of the track, if one was decoded.
    pub sample_entry: Option<SampleEntry>,
}

/// Output of a [`BoxDecoder`].
#[derive(Debug, Clone, Default)]
pub struct DecodedBoxes {
    pub boxes: Vec<Mp4Box>,
    pub tracks: HashMap<u32, ProvisionalTrack>,
}

impl DecodedBoxes {
    /// The top-level `moov`, if present and complete.
    pub fn complete_moov(&self) -> Option<&Mp4Box> {
        self.boxes
            .iter()
            .find(|b| b.box_type == AtomType::MOOV && b.is_complete)
    }
}

/// Decodes a (possibly truncated) buffer into a box tree.
pub trait BoxDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedBoxes>;
}
