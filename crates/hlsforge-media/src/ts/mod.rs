//! MPEG transport stream segment packetizer.
//!
//! [`TsPacketizer`] turns one windowed segment plus the payload bytes of its
//! samples into a self-contained TS body: PAT and PMT first, then one PES per
//! sample in decode order across tracks.

pub mod pes;
pub mod psi;

use crate::segmenter::{SegmentData, WindowedSample, WindowedSegment};
use crate::time::{rescale, MPEG_CLOCK};
use crate::track::{CodecId, Track};
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use pes::{stream_id, NalFormat};
use psi::{stream_type, PmtStream};

/// Transport stream packet size.
pub const TS_PACKET_SIZE: usize = 188;
/// Sync byte.
pub const TS_SYNC_BYTE: u8 = 0x47;

pub const PID_PAT: u16 = 0x0000;
pub const PID_PMT: u16 = 0x1000;
pub const PID_VIDEO: u16 = 0x0100;
pub const PID_AUDIO: u16 = 0x0101;

const PROGRAM_NUMBER: u16 = 1;
const TRANSPORT_STREAM_ID: u16 = 1;

/// How samples of a track are framed into PES payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    AnnexB(NalFormat),
    Adts,
    Raw,
}

/// Output stream for one selected track.
#[derive(Debug)]
struct Stream<'a> {
    track: &'a Track,
    pid: u16,
    stream_id: u8,
    stream_type: u8,
    framing: Framing,
    continuity: u8,
}

impl<'a> Stream<'a> {
    fn for_track(track: &'a Track) -> Option<Self> {
        let (pid, stream_id, stream_type, framing) = match track.codec_id {
            CodecId::Avc1 => (
                PID_VIDEO,
                stream_id::VIDEO,
                stream_type::H264,
                Framing::AnnexB(NalFormat::Avc),
            ),
            CodecId::Hevc => (
                PID_VIDEO,
                stream_id::VIDEO,
                stream_type::H265,
                Framing::AnnexB(NalFormat::Hevc),
            ),
            CodecId::Aac => (PID_AUDIO, stream_id::AUDIO, stream_type::AAC_ADTS, Framing::Adts),
            CodecId::Mp3 => (PID_AUDIO, stream_id::AUDIO, stream_type::MPEG1_AUDIO, Framing::Raw),
            CodecId::Ac3 => (
                PID_AUDIO,
                stream_id::PRIVATE_STREAM_1,
                stream_type::AC3,
                Framing::Raw,
            ),
            CodecId::Eac3 => (
                PID_AUDIO,
                stream_id::PRIVATE_STREAM_1,
                stream_type::EAC3,
                Framing::Raw,
            ),
            _ => return None,
        };

        Some(Self {
            track,
            pid,
            stream_id,
            stream_type,
            framing,
            continuity: 0,
        })
    }

    fn next_cc(&mut self) -> u8 {
        let cc = self.continuity;
        self.continuity = (self.continuity + 1) & 0x0F;
        cc
    }

    /// Frame one sample into its elementary stream bytes.
    fn frame(&self, data: &[u8], is_keyframe: bool) -> Vec<u8> {
        match self.framing {
            Framing::AnnexB(format) => {
                let parameter_sets: &[Vec<u8>] = if is_keyframe {
                    &self.track.codec_extra_data
                } else {
                    &[]
                };
                pes::to_annexb(data, self.track.nal_length_size, format, parameter_sets)
            }
            Framing::Adts => {
                let header = pes::adts_header(
                    self.track.profile_object_type.unwrap_or(2),
                    self.track.rate_index.unwrap_or(4),
                    self.track.channels_index.unwrap_or(2),
                    data.len(),
                );
                let mut out = Vec::with_capacity(header.len() + data.len());
                out.extend_from_slice(&header);
                out.extend_from_slice(data);
                out
            }
            Framing::Raw => data.to_vec(),
        }
    }
}

/// Builds the transport stream body of one segment.
#[derive(Debug, Default)]
pub struct TsPacketizer {
    pat_cc: u8,
    pmt_cc: u8,
}

impl TsPacketizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packetize every windowed sample of `segment`, reading payloads from
    /// `data`. Tracks with codecs that cannot be carried are skipped.
    pub fn packetize(&mut self, segment: &WindowedSegment<'_>, data: &SegmentData) -> Result<Bytes> {
        let mut streams: Vec<Stream<'_>> = Vec::new();
        let mut track_slots: Vec<Option<usize>> = Vec::with_capacity(segment.tracks.len());

        for windowed in &segment.tracks {
            let slot = match Stream::for_track(windowed.track) {
                Some(stream) if streams.iter().any(|s| s.pid == stream.pid) => {
                    tracing::warn!(
                        track_id = windowed.track.track_id,
                        "Second {} track in segment, skipping",
                        windowed.track.kind
                    );
                    None
                }
                Some(stream) => {
                    streams.push(stream);
                    Some(streams.len() - 1)
                }
                None => {
                    tracing::warn!(
                        track_id = windowed.track.track_id,
                        codec = %windowed.track.codec,
                        "Unsupported codec for transport stream, skipping track"
                    );
                    None
                }
            };
            track_slots.push(slot);
        }

        if streams.is_empty() {
            return Err(Error::unsupported("no track can be carried in a transport stream"));
        }

        let pcr_pid = streams
            .iter()
            .find(|s| s.pid == PID_VIDEO)
            .unwrap_or(&streams[0])
            .pid;

        // Decode-order interleave across tracks
        let mut order: Vec<(u64, usize, &WindowedSample<'_>)> = segment
            .tracks
            .iter()
            .zip(&track_slots)
            .filter_map(|(windowed, slot)| slot.map(|slot| (windowed, slot)))
            .flat_map(|(windowed, slot)| {
                windowed.samples.iter().map(move |s| {
                    (rescale(s.sample.dts, s.timescale, MPEG_CLOCK), slot, s)
                })
            })
            .collect();
        order.sort_by_key(|(dts, slot, _)| (*dts, *slot));

        let mut out = BytesMut::with_capacity(data.total_len() + data.total_len() / 8 + 1024);

        let pat = psi::pat(TRANSPORT_STREAM_ID, PROGRAM_NUMBER, PID_PMT);
        let cc = self.pat_cc;
        self.pat_cc = (cc + 1) & 0x0F;
        write_section(&mut out, PID_PAT, cc, &pat);

        let pmt_streams: Vec<PmtStream> = streams
            .iter()
            .map(|s| PmtStream {
                stream_type: s.stream_type,
                pid: s.pid,
            })
            .collect();
        let pmt = psi::pmt(PROGRAM_NUMBER, pcr_pid, &pmt_streams);
        let cc = self.pmt_cc;
        self.pmt_cc = (cc + 1) & 0x0F;
        write_section(&mut out, PID_PMT, cc, &pmt);

        for (dts, slot, windowed) in order {
            let sample = windowed.sample;
            let payload = data.sample_data(sample).ok_or_else(|| {
                Error::Transport(format!(
                    "payload of {} bytes at offset {} was not read",
                    sample.size, sample.offset
                ))
            })?;

            let stream = &mut streams[slot];
            let pts = rescale(sample.pts(), windowed.timescale, MPEG_CLOCK);
            let es = stream.frame(payload, sample.is_keyframe);

            let mut pes_data = pes::pes_header(stream.stream_id, pts, Some(dts), es.len());
            pes_data.extend_from_slice(&es);

            let pcr = (stream.pid == pcr_pid).then_some(dts);
            let random_access = sample.is_keyframe && stream.pid == pcr_pid;
            write_pes(&mut out, stream, &pes_data, pcr, random_access);
        }

        tracing::debug!(
            segment = segment.index,
            packets = out.len() / TS_PACKET_SIZE,
            "Packetized segment"
        );

        Ok(out.freeze())
    }
}

fn ts_header(out: &mut BytesMut, pid: u16, payload_unit_start: bool, adaptation: bool, cc: u8) {
    out.put_u8(TS_SYNC_BYTE);
    out.put_u8(((payload_unit_start as u8) << 6) | ((pid >> 8) as u8 & 0x1F));
    out.put_u8(pid as u8);
    let control = if adaptation { 0x30 } else { 0x10 };
    out.put_u8(control | (cc & 0x0F));
}

/// Write a PSI section that fits in one packet.
fn write_section(out: &mut BytesMut, pid: u16, cc: u8, section: &[u8]) {
    ts_header(out, pid, true, false, cc);
    // pointer_field
    out.put_u8(0);
    out.put_slice(section);
    out.put_bytes(0xFF, TS_PACKET_SIZE - 5 - section.len());
}

fn write_pcr(out: &mut BytesMut, base: u64) {
    let base = base & pes::TIMESTAMP_MASK;
    out.put_u8((base >> 25) as u8);
    out.put_u8((base >> 17) as u8);
    out.put_u8((base >> 9) as u8);
    out.put_u8((base >> 1) as u8);
    // low base bit, reserved bits, extension 0
    out.put_u8((((base & 1) as u8) << 7) | 0x7E);
    out.put_u8(0);
}

/// Split one PES into TS packets. The first packet carries the PCR and the
/// random access indicator when requested; the last is padded with
/// adaptation field stuffing.
fn write_pes(
    out: &mut BytesMut,
    stream: &mut Stream<'_>,
    pes_data: &[u8],
    pcr: Option<u64>,
    random_access: bool,
) {
    let mut remaining = pes_data;
    let mut first = true;

    while !remaining.is_empty() {
        let pcr = if first { pcr } else { None };
        let mut flags = 0u8;
        if first && random_access {
            flags |= 0x40;
        }
        if pcr.is_some() {
            flags |= 0x10;
        }

        // length byte + flags byte + PCR
        let mut adaptation_len = if flags != 0 {
            2 + if pcr.is_some() { 6 } else { 0 }
        } else {
            0
        };
        let space = TS_PACKET_SIZE - 4 - adaptation_len;
        let payload_len = remaining.len().min(space);
        adaptation_len += space - payload_len;

        ts_header(out, stream.pid, first, adaptation_len > 0, stream.next_cc());

        if adaptation_len > 0 {
            out.put_u8((adaptation_len - 1) as u8);
            if adaptation_len > 1 {
                out.put_u8(flags);
                let mut written = 2;
                if let Some(base) = pcr {
                    write_pcr(out, base);
                    written += 6;
                }
                out.put_bytes(0xFF, adaptation_len - written);
            }
        }

        out.put_slice(&remaining[..payload_len]);
        remaining = &remaining[payload_len..];
        first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::fixtures::{av_fixture, Mp4Builder, TrackSpec};
    use crate::mp4::{BoxDecoder, Mp4BoxDecoder};
    use crate::segmenter::{ByteRange, SegmentList, Segmenter};
    use crate::track::build_tracks;
    use std::collections::HashMap;

    struct Fixture {
        file: Vec<u8>,
        tracks: Vec<Track>,
        segments: SegmentList,
    }

    fn fixture(file: Vec<u8>) -> Fixture {
        let decoded = Mp4BoxDecoder::new().decode(&file).unwrap();
        let tracks: Vec<Track> = build_tracks(&decoded)
            .tracks
            .iter()
            .map(|t| t.materialize())
            .collect();
        let segments = Segmenter::new(2_000).segment(&tracks);
        Fixture {
            file,
            tracks,
            segments,
        }
    }

    fn read_ranges(file: &[u8], ranges: Vec<ByteRange>) -> SegmentData {
        let chunks = ranges
            .iter()
            .map(|r| Bytes::copy_from_slice(&file[r.offset as usize..r.end() as usize]))
            .collect();
        SegmentData::new(ranges, chunks)
    }

    fn pid(packet: &[u8]) -> u16 {
        (((packet[1] & 0x1F) as u16) << 8) | packet[2] as u16
    }

    fn payload_start(packet: &[u8]) -> bool {
        packet[1] & 0x40 != 0
    }

    /// Payload bytes of a packet after the adaptation field.
    fn payload(packet: &[u8]) -> &[u8] {
        if packet[3] & 0x20 != 0 {
            &packet[5 + packet[4] as usize..]
        } else {
            &packet[4..]
        }
    }

    #[test]
    fn test_packetize_av_segment() {
        let fx = fixture(av_fixture(6));
        let segment = fx.segments.load_samples(0, &fx.tracks).unwrap();
        let data = read_ranges(&fx.file, segment.byte_ranges());

        let body = TsPacketizer::new().packetize(&segment, &data).unwrap();
        assert_eq!(body.len() % TS_PACKET_SIZE, 0);

        let packets: Vec<&[u8]> = body.chunks(TS_PACKET_SIZE).collect();
        assert!(packets.iter().all(|p| p[0] == TS_SYNC_BYTE));
        assert_eq!(pid(packets[0]), PID_PAT);
        assert_eq!(pid(packets[1]), PID_PMT);

        // PMT announces H.264 then AAC
        let pmt = &packets[1][5..];
        assert_eq!(pmt[12], stream_type::H264);
        assert_eq!(pmt[17], stream_type::AAC_ADTS);

        // continuity counters advance per PID
        let mut counters: HashMap<u16, u8> = HashMap::new();
        for packet in &packets[2..] {
            let cc = packet[3] & 0x0F;
            if let Some(prev) = counters.insert(pid(packet), cc) {
                assert_eq!(cc, (prev + 1) & 0x0F);
            }
        }

        // one PES per sample
        let starts = |target: u16| {
            packets
                .iter()
                .filter(|p| pid(p) == target && payload_start(p))
                .count()
        };
        assert_eq!(starts(PID_VIDEO), segment.tracks[0].samples.len());
        assert_eq!(starts(PID_AUDIO), segment.tracks[1].samples.len());

        // first video packet: PCR + random access, Annex-B AUD after the PES header
        let first_video = packets.iter().find(|p| pid(p) == PID_VIDEO).unwrap();
        assert_eq!(first_video[3] & 0x20, 0x20);
        assert_eq!(first_video[5] & 0x50, 0x50);
        let pes = payload(first_video);
        assert_eq!(&pes[..4], &[0x00, 0x00, 0x01, 0xE0]);
        let es = &pes[9 + pes[8] as usize..];
        assert_eq!(&es[..6], &[0, 0, 0, 1, 0x09, 0xF0]);
        // SPS follows on keyframes
        assert_eq!(&es[6..10], &[0, 0, 0, 1]);
        assert_eq!(es[10] & 0x1F, 7);

        // audio PES payloads start with an ADTS sync word
        let first_audio = packets
            .iter()
            .find(|p| pid(p) == PID_AUDIO && payload_start(p))
            .unwrap();
        let pes = payload(first_audio);
        assert_eq!(pes[3], 0xC0);
        let es = &pes[9 + pes[8] as usize..];
        assert_eq!(&es[..2], &[0xFF, 0xF1]);
    }

    #[test]
    fn test_short_read_is_transport_error() {
        let fx = fixture(av_fixture(2));
        let segment = fx.segments.load_samples(0, &fx.tracks).unwrap();
        let data = SegmentData::new(vec![ByteRange::new(0, 4)], vec![Bytes::from_static(b"ftyp")]);

        let err = TsPacketizer::new().packetize(&segment, &data).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_audio_only_segment_uses_audio_pcr() {
        let file = Mp4Builder::new()
            .track(TrackSpec::ac3(48_000, 2).with_uniform_samples(100, 1536, 64))
            .build();
        let fx = fixture(file);
        let segment = fx.segments.load_samples(0, &fx.tracks).unwrap();
        let data = read_ranges(&fx.file, segment.byte_ranges());

        let body = TsPacketizer::new().packetize(&segment, &data).unwrap();
        let packets: Vec<&[u8]> = body.chunks(TS_PACKET_SIZE).collect();

        let pmt = &packets[1][5..];
        // PCR PID is the audio PID
        assert_eq!(&pmt[8..10], &[0xE1, 0x01]);
        assert_eq!(pmt[12], stream_type::AC3);

        let first_audio = packets.iter().find(|p| pid(p) == PID_AUDIO).unwrap();
        assert_eq!(first_audio[5] & 0x10, 0x10);
        assert_eq!(payload(first_audio)[3], stream_id::PRIVATE_STREAM_1);
    }

    #[test]
    fn test_unsupported_only_tracks() {
        let fx = fixture(av_fixture(2));
        let mut tracks = fx.tracks.clone();
        for track in &mut tracks {
            track.codec_id = CodecId::Vorbis;
        }
        let segment = fx.segments.load_samples(0, &tracks).unwrap();
        let data = read_ranges(&fx.file, segment.byte_ranges());
        assert!(matches!(
            TsPacketizer::new().packetize(&segment, &data),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_small_payload_is_stuffed() {
        let mut out = BytesMut::new();
        let track = fixture(av_fixture(1)).tracks.remove(1);
        let mut stream = Stream::for_track(&track).unwrap();
        write_pes(&mut out, &mut stream, &[0xAB; 10], None, false);

        assert_eq!(out.len(), TS_PACKET_SIZE);
        assert_eq!(out[3] & 0x30, 0x30);
        assert_eq!(out[4] as usize, TS_PACKET_SIZE - 4 - 10 - 1);
        assert_eq!(&out[TS_PACKET_SIZE - 10..], &[0xAB; 10]);

        // a payload one byte short of a full packet needs a bare length byte
        let mut out = BytesMut::new();
        write_pes(&mut out, &mut stream, &[0xCD; 183], None, false);
        assert_eq!(out.len(), TS_PACKET_SIZE);
        assert_eq!(out[4], 0);
        assert_eq!(out[3] & 0x0F, 1);
    }
}
