//! Buffer-based MP4 box decoder.

use super::atoms::{
    decode_language, AtomType, BoxPayload, HandlerType, MediaHeader, SampleEntry,
    SampleEntryKind, TrackHeader,
};
use super::codec_config::{AvcConfig, EsDescriptor, HevcConfig};
use super::{BoxDecoder, DecodedBoxes, Mp4Box, ProvisionalTrack};
use crate::sample_table::{CompositionOffset, SampleSizes, SampleToChunk, TimeToSample};
use crate::track::TrackKind;
use crate::{Error, Result};
use std::collections::HashMap;

/// Fixed fields of a VisualSampleEntry after the box header.
const VISUAL_ENTRY_SIZE: usize = 78;
/// Fixed fields of a version 0 AudioSampleEntry after the box header.
const AUDIO_ENTRY_SIZE: usize = 28;

/// Decoder for ISO BMFF boxes held in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4BoxDecoder;

impl Mp4BoxDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Read sibling boxes from `data`, whose first byte sits at `base` in the
    /// decoded buffer.
    fn read_boxes(&self, data: &[u8], base: u64) -> Vec<Mp4Box> {
        let mut boxes = Vec::new();
        let mut pos = 0usize;

        while pos + 8 <= data.len() {
            let size = be_u32(data, pos).unwrap_or(0) as u64;
            let box_type = AtomType::from_bytes([
                data[pos + 4],
                data[pos + 5],
                data[pos + 6],
                data[pos + 7],
            ]);

            let (actual_size, header_size) = if size == 1 {
                // 64-bit extended size
                match be_u64(data, pos + 8) {
                    Some(ext) => (ext, 16u8),
                    None => break,
                }
            } else if size == 0 {
                // Box extends to end of buffer
                ((data.len() - pos) as u64, 8u8)
            } else {
                (size, 8u8)
            };

            if actual_size < header_size as u64 {
                break;
            }

            let available = (data.len() - pos) as u64;
            let is_complete = actual_size <= available;
            let offset = base + pos as u64;

            let mut mp4_box = Mp4Box {
                box_type,
                size: actual_size,
                offset,
                header_size,
                is_complete,
                payload: BoxPayload::None,
                children: Vec::new(),
            };

            if is_complete {
                let body = &data[pos + header_size as usize..pos + actual_size as usize];
                if box_type.is_container() {
                    mp4_box.children = self.read_boxes(body, offset + header_size as u64);
                } else {
                    mp4_box.payload = read_payload(box_type, body);
                }
            }

            boxes.push(mp4_box);

            if !is_complete {
                break;
            }
            pos += actual_size as usize;
        }

        boxes
    }
}

impl BoxDecoder for Mp4BoxDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedBoxes> {
        if data.len() >= 8 {
            let size = be_u32(data, 0).unwrap_or(0);
            if (2..8).contains(&size) {
                return Err(Error::invalid_mp4(format!(
                    "first box declares impossible size {size}"
                )));
            }
        }

        let boxes = self.read_boxes(data, 0);
        let mut tracks = HashMap::new();

        if let Some(moov) = boxes
            .iter()
            .find(|b| b.box_type == AtomType::MOOV && b.is_complete)
        {
            for trak in moov.children_of(AtomType::TRAK) {
                if let Some(track) = provisional_track(trak) {
                    tracks.insert(track.track_id, track);
                }
            }
        }

        Ok(DecodedBoxes { boxes, tracks })
    }
}

fn provisional_track(trak: &Mp4Box) -> Option<ProvisionalTrack> {
    let track_id = match &trak.child(AtomType::TKHD)?.payload {
        BoxPayload::TrackHeader(tkhd) => tkhd.track_id,
        _ => return None,
    };

    let mdia = trak.child(AtomType::MDIA)?;
    let kind = match &mdia.child(AtomType::HDLR)?.payload {
        BoxPayload::Handler(HandlerType::Video) => TrackKind::Video,
        BoxPayload::Handler(HandlerType::Audio) => TrackKind::Audio,
        _ => return None,
    };

    let sample_entry = mdia
        .child(AtomType::MINF)
        .and_then(|minf| minf.child(AtomType::STBL))
        .and_then(|stbl| stbl.child(AtomType::STSD))
        .and_then(|stsd| match &stsd.payload {
            BoxPayload::SampleDescriptions(entries) => entries.first().cloned(),
            _ => None,
        });

    let codec = sample_entry
        .as_ref()
        .map(|entry| entry.format.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Some(ProvisionalTrack {
        track_id,
        kind,
        mime_type: format!("{}/mp4; codecs=\"{}\"", kind.as_str(), codec),
        sample_entry,
    })
}

fn read_payload(box_type: AtomType, data: &[u8]) -> BoxPayload {
    let payload = match box_type {
        AtomType::TKHD => parse_tkhd(data).map(BoxPayload::TrackHeader),
        AtomType::MDHD => parse_mdhd(data).map(BoxPayload::MediaHeader),
        AtomType::HDLR => parse_hdlr(data).map(BoxPayload::Handler),
        AtomType::STSD => Some(BoxPayload::SampleDescriptions(parse_stsd(data))),
        AtomType::STTS => parse_stts(data).map(BoxPayload::TimeToSample),
        AtomType::STSS => parse_stss(data).map(BoxPayload::SyncSamples),
        AtomType::STSZ => parse_stsz(data).map(BoxPayload::SampleSizes),
        AtomType::STSC => parse_stsc(data).map(BoxPayload::SampleToChunk),
        AtomType::STCO => parse_stco(data).map(BoxPayload::ChunkOffsets),
        AtomType::CO64 => parse_co64(data).map(BoxPayload::ChunkOffsets),
        AtomType::CTTS => parse_ctts(data).map(BoxPayload::CompositionOffsets),
        _ => None,
    };

    payload.unwrap_or_else(|| {
        if box_type != AtomType::MDAT {
            tracing::trace!(atom = %box_type, len = data.len(), "Atom left undecoded");
        }
        BoxPayload::None
    })
}

fn be_u16(data: &[u8], pos: usize) -> Option<u16> {
    data.get(pos..pos + 2)?.try_into().ok().map(u16::from_be_bytes)
}

fn be_u32(data: &[u8], pos: usize) -> Option<u32> {
    data.get(pos..pos + 4)?.try_into().ok().map(u32::from_be_bytes)
}

fn be_u64(data: &[u8], pos: usize) -> Option<u64> {
    data.get(pos..pos + 8)?.try_into().ok().map(u64::from_be_bytes)
}

/// Entry count of a full box table, capped by what the body can hold.
fn entry_count(data: &[u8], header: usize, entry_size: usize) -> Option<usize> {
    let declared = be_u32(data, 4)? as usize;
    Some(declared.min(data.len().saturating_sub(header) / entry_size))
}

/// Parse tkhd (track header).
fn parse_tkhd(data: &[u8]) -> Option<TrackHeader> {
    let version = *data.first()?;
    let (id_pos, size_pos) = if version == 0 { (12, 76) } else { (20, 84) };

    Some(TrackHeader {
        track_id: be_u32(data, id_pos)?,
        // 16.16 fixed point
        width: be_u32(data, size_pos).map(|w| w >> 16).unwrap_or(0),
        height: be_u32(data, size_pos + 4).map(|h| h >> 16).unwrap_or(0),
    })
}

/// Parse mdhd (media header).
fn parse_mdhd(data: &[u8]) -> Option<MediaHeader> {
    let version = *data.first()?;

    let (timescale, duration, language_pos) = if version == 0 {
        let duration = be_u32(data, 16)?;
        // All ones means unknown
        let duration = if duration == u32::MAX { 0 } else { duration as u64 };
        (be_u32(data, 12)?, duration, 20)
    } else {
        let duration = be_u64(data, 24)?;
        let duration = if duration == u64::MAX { 0 } else { duration };
        (be_u32(data, 20)?, duration, 32)
    };

    Some(MediaHeader {
        timescale,
        duration,
        language: be_u16(data, language_pos)
            .map(decode_language)
            .unwrap_or_else(|| "und".to_string()),
    })
}

/// Parse hdlr (handler) atom.
fn parse_hdlr(data: &[u8]) -> Option<HandlerType> {
    let bytes = data.get(8..12)?;
    Some(HandlerType::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Parse stts (decoding time to sample).
fn parse_stts(data: &[u8]) -> Option<Vec<TimeToSample>> {
    let count = entry_count(data, 8, 8)?;
    Some(
        (0..count)
            .filter_map(|i| {
                let offset = 8 + i * 8;
                Some(TimeToSample {
                    sample_count: be_u32(data, offset)?,
                    sample_delta: be_u32(data, offset + 4)?,
                })
            })
            .collect(),
    )
}

/// Parse stss (sync sample).
fn parse_stss(data: &[u8]) -> Option<Vec<u32>> {
    let count = entry_count(data, 8, 4)?;
    Some((0..count).filter_map(|i| be_u32(data, 8 + i * 4)).collect())
}

/// Parse stsz (sample size).
fn parse_stsz(data: &[u8]) -> Option<SampleSizes> {
    let uniform_size = be_u32(data, 4)?;
    let sample_count = be_u32(data, 8)?;

    if uniform_size != 0 {
        return Some(SampleSizes::Uniform {
            size: uniform_size,
            count: sample_count,
        });
    }

    let count = (sample_count as usize).min(data.len().saturating_sub(12) / 4);
    Some(SampleSizes::Explicit(
        (0..count).filter_map(|i| be_u32(data, 12 + i * 4)).collect(),
    ))
}

/// Parse stsc (sample to chunk).
fn parse_stsc(data: &[u8]) -> Option<Vec<SampleToChunk>> {
    let count = entry_count(data, 8, 12)?;
    Some(
        (0..count)
            .filter_map(|i| {
                let offset = 8 + i * 12;
                Some(SampleToChunk {
                    first_chunk: be_u32(data, offset)?,
                    samples_per_chunk: be_u32(data, offset + 4)?,
                    sample_description_index: be_u32(data, offset + 8)?,
                })
            })
            .collect(),
    )
}

/// Parse stco (chunk offset, 32-bit).
fn parse_stco(data: &[u8]) -> Option<Vec<u64>> {
    let count = entry_count(data, 8, 4)?;
    Some(
        (0..count)
            .filter_map(|i| be_u32(data, 8 + i * 4).map(u64::from))
            .collect(),
    )
}

/// Parse co64 (chunk offset, 64-bit).
fn parse_co64(data: &[u8]) -> Option<Vec<u64>> {
    let count = entry_count(data, 8, 8)?;
    Some((0..count).filter_map(|i| be_u64(data, 8 + i * 8)).collect())
}

/// Parse ctts (composition time to sample).
fn parse_ctts(data: &[u8]) -> Option<Vec<CompositionOffset>> {
    let count = entry_count(data, 8, 8)?;
    Some(
        (0..count)
            .filter_map(|i| {
                let offset = 8 + i * 8;
                // Version 0 offsets are unsigned on paper but written signed
                // by most muxers; both read the same as i32.
                Some(CompositionOffset {
                    sample_count: be_u32(data, offset)?,
                    sample_offset: be_u32(data, offset + 4)? as i32,
                })
            })
            .collect(),
    )
}

/// Parse stsd (sample description) entries.
fn parse_stsd(data: &[u8]) -> Vec<SampleEntry> {
    let Some(declared) = be_u32(data, 4) else {
        return Vec::new();
    };

    child_boxes(data.get(8..).unwrap_or_default())
        .into_iter()
        .take(declared as usize)
        .filter_map(|(format, body)| parse_sample_entry(format, body))
        .collect()
}

fn parse_sample_entry(format: AtomType, data: &[u8]) -> Option<SampleEntry> {
    if format.is_visual_entry() {
        if data.len() < VISUAL_ENTRY_SIZE {
            return None;
        }
        let mut avc = None;
        let mut hevc = None;
        for (child, body) in child_boxes(&data[VISUAL_ENTRY_SIZE..]) {
            match child {
                AtomType::AVCC => avc = AvcConfig::parse(body),
                AtomType::HVCC => hevc = HevcConfig::parse(body),
                _ => {}
            }
        }
        return Some(SampleEntry {
            format,
            kind: SampleEntryKind::Visual {
                width: be_u16(data, 24)?,
                height: be_u16(data, 26)?,
                avc,
                hevc,
            },
        });
    }

    if format.is_audio_entry() {
        if data.len() < AUDIO_ENTRY_SIZE {
            return None;
        }
        let version = be_u16(data, 8)?;
        let mut channel_count = be_u16(data, 16)?;
        let sample_size = be_u16(data, 18)?;
        let mut sample_rate = be_u32(data, 24)? >> 16;

        // QuickTime sound description versions append extra fields.
        let children_start = match version {
            1 => AUDIO_ENTRY_SIZE + 16,
            2 => {
                if let Some(rate) = be_u64(data, AUDIO_ENTRY_SIZE + 4) {
                    sample_rate = f64::from_bits(rate) as u32;
                }
                if let Some(channels) = be_u32(data, AUDIO_ENTRY_SIZE + 12) {
                    channel_count = channels as u16;
                }
                AUDIO_ENTRY_SIZE + 36
            }
            _ => AUDIO_ENTRY_SIZE,
        };

        let esds = data
            .get(children_start..)
            .and_then(find_esds)
            .and_then(EsDescriptor::parse);

        return Some(SampleEntry {
            format,
            kind: SampleEntryKind::Audio {
                channel_count,
                sample_size,
                sample_rate,
                esds,
            },
        });
    }

    None
}

/// Locate an `esds` body among sample entry children, looking inside a
/// QuickTime `wave` box as well.
fn find_esds(data: &[u8]) -> Option<&[u8]> {
    for (child, body) in child_boxes(data) {
        if child == AtomType::ESDS {
            return Some(body);
        }
        if child.0 == *b"wave" {
            if let Some(found) = find_esds(body) {
                return Some(found);
            }
        }
    }
    None
}

/// Split a run of complete sibling boxes into (type, body) pairs.
fn child_boxes(data: &[u8]) -> Vec<(AtomType, &[u8])> {
    let mut children = Vec::new();
    let mut pos = 0;

    while pos + 8 <= data.len() {
        let Some(size) = be_u32(data, pos) else {
            break;
        };
        let size = size as usize;
        if size < 8 || pos + size > data.len() {
            break;
        }
        let box_type =
            AtomType::from_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
        children.push((box_type, &data[pos + 8..pos + size]));
        pos += size;
    }

    children
}
