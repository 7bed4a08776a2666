//! Normalized track and codec model.
//!
//! [`build_tracks`] walks a decoded box tree and produces one [`Mp4Track`]
//! per usable `trak`: timing, bitrate, frame rate, codec identity, codec
//! description string and the codec extra data needed to emit a transport
//! stream later. Samples are not expanded here; see [`Mp4Track::materialize`].

use crate::mp4::{
    AtomType, AvcConfig, BoxPayload, DecodedBoxes, HevcConfig, Mp4Box, ProvisionalTrack,
    SampleEntryKind,
};
use crate::sample_table::{Sample, SampleTableBuilder, SampleTables};
use crate::time::{rescale, MILLIS};
use crate::{Error, Result};
use std::time::Instant;

#[cfg(feature = "serialize")]
use serde::Serialize;

/// Elementary stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized codec identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "UPPERCASE"))]
pub enum CodecId {
    #[default]
    Unknown,
    Avc1,
    Hevc,
    Vp8,
    Vp9,
    Aac,
    Ac3,
    Eac3,
    Mp3,
    Dts,
    Vorbis,
    Opus,
}

impl CodecId {
    /// Map a sample entry tag to a codec. `mp4a` is disambiguated by the
    /// elementary stream descriptor's object type indication.
    pub fn from_tag(tag: &str, object_type_indication: Option<u8>) -> Self {
        match tag {
            "h264" | "H264" | "avc1" | "avc3" | "avcC" => Self::Avc1,
            "hev1" | "hvc1" | "hevC" | "hvcC" => Self::Hevc,
            "vp08" => Self::Vp8,
            "vp09" => Self::Vp9,
            "mp4a" => match object_type_indication {
                Some(0x40 | 0x66 | 0x67 | 0x68) => Self::Aac,
                Some(0x69 | 0x6B) => Self::Mp3,
                Some(0xA9) => Self::Dts,
                Some(0xDD) => Self::Vorbis,
                _ => Self::Unknown,
            },
            "ac-3" => Self::Ac3,
            "ec-3" => Self::Eac3,
            "Opus" => Self::Opus,
            _ => Self::Unknown,
        }
    }
}

/// One elementary stream of a source.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
pub struct Track {
    pub track_id: u32,
    #[cfg_attr(feature = "serialize", serde(rename = "type"))]
    pub kind: TrackKind,
    pub language: String,
    pub mime_type: String,
    /// Ticks per second.
    pub timescale: u32,
    /// Duration in milliseconds.
    pub duration: u64,
    /// Raw sample entry tag.
    pub codec: String,
    pub codec_id: CodecId,
    /// SPS then PPS for AVC, parameter set NAL units for HEVC,
    /// AudioSpecificConfig for AAC.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub codec_extra_data: Vec<Vec<u8>>,
    /// Length prefix size of NAL units in samples (AVC/HEVC).
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub nal_length_size: u8,
    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub profile_object_type: Option<u8>,
    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub rate_index: Option<u8>,
    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub channels_index: Option<u8>,
    /// Empty until materialized.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub samples: Vec<Sample>,
}

impl Track {
    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }
}

/// A track as discovered, with derived metadata and the raw sample tables.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "camelCase"))]
pub struct Mp4Track {
    #[cfg_attr(feature = "serialize", serde(flatten))]
    pub track: Track,
    /// Average bitrate in kbit/s.
    pub bitrate: u64,
    /// Sum of all sample sizes in bytes.
    pub total_size: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// RFC 6381 codec string used in playlist `CODECS`.
    pub codec_description: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_size: u16,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub tables: SampleTables,
}

impl Mp4Track {
    pub fn kind(&self) -> TrackKind {
        self.track.kind
    }

    /// Clone the track with its samples expanded from the raw tables.
    pub fn materialize(&self) -> Track {
        let started = Instant::now();
        let mut track = self.track.clone();
        track.samples = self.tables.materialize(track.is_video());
        tracing::debug!(
            track_id = track.track_id,
            samples = track.samples.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Expanded sample table"
        );
        track
    }
}

/// All tracks of one source.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
pub struct MediaInfo {
    pub tracks: Vec<Mp4Track>,
}

impl MediaInfo {
    pub fn video_tracks(&self) -> impl Iterator<Item = &Mp4Track> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &Mp4Track> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn first_video(&self) -> Option<&Mp4Track> {
        self.video_tracks().next()
    }

    pub fn first_audio(&self) -> Option<&Mp4Track> {
        self.audio_tracks().next()
    }

    /// Select tracks by 1-based index within their kind. `None` leaves that
    /// kind out.
    pub fn select(&self, video: Option<u32>, audio: Option<u32>) -> Result<Vec<&Mp4Track>> {
        let mut selected = Vec::with_capacity(2);
        if let Some(index) = video {
            selected.push(pick(self.video_tracks(), TrackKind::Video, index)?);
        }
        if let Some(index) = audio {
            selected.push(pick(self.audio_tracks(), TrackKind::Audio, index)?);
        }
        Ok(selected)
    }
}

fn pick<'a>(
    mut tracks: impl Iterator<Item = &'a Mp4Track>,
    kind: TrackKind,
    index: u32,
) -> Result<&'a Mp4Track> {
    index
        .checked_sub(1)
        .and_then(|i| tracks.nth(i as usize))
        .ok_or(Error::TrackNotFound {
            kind: kind.as_str(),
            index,
        })
}

/// Build the track model from a decoded box tree.
///
/// Tracks without a provisional record, without a timescale, or with a
/// handler other than video/audio are skipped. A movie with no usable
/// tracks yields an empty [`MediaInfo`].
pub fn build_tracks(decoded: &DecodedBoxes) -> MediaInfo {
    let Some(moov) = decoded.complete_moov() else {
        return MediaInfo::default();
    };

    let tracks = moov
        .children_of(AtomType::TRAK)
        .filter_map(|trak| {
            let track_id = match &trak.child(AtomType::TKHD)?.payload {
                BoxPayload::TrackHeader(tkhd) => tkhd.track_id,
                _ => return None,
            };
            let Some(provisional) = decoded.tracks.get(&track_id) else {
                tracing::debug!(track_id, "Skipping track without provisional record");
                return None;
            };
            build_track(trak, provisional)
        })
        .collect();

    MediaInfo { tracks }
}

fn build_track(trak: &Mp4Box, provisional: &ProvisionalTrack) -> Option<Mp4Track> {
    let mdia = trak.child(AtomType::MDIA)?;
    let header = match &mdia.child(AtomType::MDHD)?.payload {
        BoxPayload::MediaHeader(header) => header,
        _ => return None,
    };
    if header.timescale == 0 {
        tracing::warn!(track_id = provisional.track_id, "Track has zero timescale, skipping");
        return None;
    }

    let stbl = mdia
        .child(AtomType::MINF)
        .and_then(|minf| minf.child(AtomType::STBL));
    let tables = stbl.map(collect_tables).unwrap_or_default();

    let timescale = header.timescale;
    let duration = if header.duration > 0 {
        rescale(header.duration, timescale, MILLIS)
    } else {
        rescale(tables.total_duration(), timescale, MILLIS)
    };

    let total_size = tables.sample_sizes.total();
    let bitrate = if duration > 0 { 8 * total_size / duration } else { 0 };

    let codec = provisional
        .sample_entry
        .as_ref()
        .map(|entry| entry.format.as_str().to_string())
        .unwrap_or_default();

    let mut track = Mp4Track {
        track: Track {
            track_id: provisional.track_id,
            kind: provisional.kind,
            language: header.language.clone(),
            mime_type: provisional.mime_type.clone(),
            timescale,
            duration,
            codec: codec.clone(),
            codec_id: CodecId::from_tag(&codec, None),
            codec_extra_data: Vec::new(),
            nal_length_size: 4,
            profile_object_type: None,
            rate_index: None,
            channels_index: None,
            samples: Vec::new(),
        },
        bitrate,
        total_size,
        fps: 0.0,
        width: 0,
        height: 0,
        codec_description: codec.clone(),
        channels: 0,
        sample_rate: 0,
        sample_size: 0,
        tables,
    };

    match provisional.sample_entry.as_ref().map(|e| &e.kind) {
        Some(SampleEntryKind::Visual {
            width,
            height,
            avc,
            hevc,
        }) => {
            track.width = *width as u32;
            track.height = *height as u32;
            if let Some(delta) = track.tables.min_sample_delta() {
                track.fps = timescale as f64 / delta as f64;
            }
            if let Some(avc) = avc {
                apply_avc(&mut track, avc);
            } else if let Some(hevc) = hevc {
                apply_hevc(&mut track, hevc);
            }
        }
        Some(SampleEntryKind::Audio {
            channel_count,
            sample_size,
            sample_rate,
            esds,
        }) => {
            track.channels = *channel_count;
            track.sample_size = *sample_size;
            track.sample_rate = *sample_rate;

            let oti = esds.as_ref().and_then(|e| e.object_type_indication());
            track.track.codec_id = CodecId::from_tag(&codec, oti);

            if let Some(info) = esds.as_ref().and_then(|e| e.decoder_specific_info()) {
                track.track.codec_extra_data = vec![info.to_vec()];
                if track.track.codec_id == CodecId::Aac && info.len() >= 2 {
                    let profile = (info[0] & 0xF8) >> 3;
                    track.track.profile_object_type = Some(profile);
                    track.track.rate_index = Some(((info[0] & 0x07) << 1) | (info[1] >> 7));
                    track.track.channels_index = Some((info[1] & 0x7F) >> 3);
                }
            }
            track.codec_description = audio_codec_description(&track.track);
        }
        None => {}
    }

    Some(track)
}

fn collect_tables(stbl: &Mp4Box) -> SampleTables {
    let mut builder = SampleTableBuilder::new();

    for child in &stbl.children {
        match &child.payload {
            BoxPayload::TimeToSample(entries) => builder.set_stts(entries.clone()),
            BoxPayload::SyncSamples(entries) => builder.set_sync_samples(entries.clone()),
            BoxPayload::SampleToChunk(entries) => builder.set_stsc(entries.clone()),
            BoxPayload::SampleSizes(sizes) => builder.set_stsz(sizes.clone()),
            BoxPayload::ChunkOffsets(offsets) => builder.set_chunk_offsets(offsets.clone()),
            BoxPayload::CompositionOffsets(entries) => builder.set_ctts(entries.clone()),
            _ => {}
        }
    }

    builder.build()
}

fn apply_avc(track: &mut Mp4Track, avc: &AvcConfig) {
    track.codec_description = avc_codec_description(&track.track.codec, avc);
    track.track.nal_length_size = avc.nal_length_size;
    track.track.codec_extra_data = avc
        .sequence_parameter_sets
        .iter()
        .chain(avc.picture_parameter_sets.iter())
        .cloned()
        .collect();

    if let Some(sps) = &avc.sps_info {
        let (width, height) = sps.present_size().unwrap_or_else(|| sps.codec_size());
        if width > 0 && height > 0 {
            track.width = width;
            track.height = height;
        }
    }
}

fn apply_hevc(track: &mut Mp4Track, hevc: &HevcConfig) {
    track.codec_description = hevc_codec_description(&track.track.codec, hevc);
    track.track.nal_length_size = hevc.nal_length_size;
    track.track.codec_extra_data = hevc.nal_units().cloned().collect();
}

/// `avc1.PP00LL`: profile and level in two-digit hex.
pub fn avc_codec_description(tag: &str, avc: &AvcConfig) -> String {
    format!(
        "{}.{:02x}00{:02x}",
        if tag.is_empty() { "avc1" } else { tag },
        avc.profile_indication,
        avc.level_indication
    )
}

/// `<tag>.[A<space-1>]<profile>.<reversed compat hex>.<L|H><level>.<constraint hex>`.
pub fn hevc_codec_description(tag: &str, hevc: &HevcConfig) -> String {
    let space = match hevc.general_profile_space {
        0 => String::new(),
        space => format!("A{}", space - 1),
    };
    format!(
        "{}.{}{}.{:x}.{}{}.{:02x}",
        if tag.is_empty() { "hvc1" } else { tag },
        space,
        hevc.general_profile_idc,
        hevc.general_profile_compatibility_flags.reverse_bits(),
        if hevc.general_tier_flag { 'H' } else { 'L' },
        hevc.general_level_idc,
        hevc.general_constraint_indicator_flags[0]
    )
}

fn audio_codec_description(track: &Track) -> String {
    match track.codec_id {
        CodecId::Aac => format!("mp4a.40.{}", track.profile_object_type.unwrap_or(2)),
        CodecId::Mp3 => "mp4a.40.34".to_string(),
        CodecId::Ac3 => "ac-3".to_string(),
        CodecId::Eac3 => "ec-3".to_string(),
        CodecId::Opus => "opus".to_string(),
        _ => track.codec.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::fixtures::{FixtureSample, Mp4Builder, TrackSpec};
    use crate::mp4::{BoxDecoder, Mp4BoxDecoder};

    fn media_info(file: &[u8]) -> MediaInfo {
        build_tracks(&Mp4BoxDecoder::new().decode(file).unwrap())
    }

    #[test]
    fn test_codec_id_table() {
        assert_eq!(CodecId::from_tag("avc1", None), CodecId::Avc1);
        assert_eq!(CodecId::from_tag("h264", None), CodecId::Avc1);
        assert_eq!(CodecId::from_tag("hvcC", None), CodecId::Hevc);
        assert_eq!(CodecId::from_tag("mp4a", Some(0x40)), CodecId::Aac);
        assert_eq!(CodecId::from_tag("mp4a", Some(0x67)), CodecId::Aac);
        assert_eq!(CodecId::from_tag("mp4a", Some(0x6B)), CodecId::Mp3);
        assert_eq!(CodecId::from_tag("mp4a", Some(0xA9)), CodecId::Dts);
        assert_eq!(CodecId::from_tag("mp4a", None), CodecId::Unknown);
        assert_eq!(CodecId::from_tag("ec-3", None), CodecId::Eac3);
        assert_eq!(CodecId::from_tag("Opus", None), CodecId::Opus);
        assert_eq!(CodecId::from_tag("mp4v", None), CodecId::Unknown);
    }

    #[test]
    fn test_avc_codec_description_golden() {
        let avc = AvcConfig {
            configuration_version: 1,
            profile_indication: 0x64,
            profile_compatibility: 0,
            level_indication: 0x1F,
            nal_length_size: 4,
            sequence_parameter_sets: vec![],
            picture_parameter_sets: vec![],
            sps_info: None,
        };
        assert_eq!(avc_codec_description("avc1", &avc), "avc1.64001f");
    }

    #[test]
    fn test_hevc_codec_description() {
        let hevc = HevcConfig {
            configuration_version: 1,
            general_profile_space: 0,
            general_tier_flag: false,
            general_profile_idc: 1,
            general_profile_compatibility_flags: 0x6000_0000,
            general_constraint_indicator_flags: [0x90, 0, 0, 0, 0, 0],
            general_level_idc: 93,
            nal_length_size: 4,
            arrays: vec![],
        };
        assert_eq!(hevc_codec_description("hvc1", &hevc), "hvc1.1.6.L93.90");

        let high = HevcConfig {
            general_profile_space: 1,
            general_tier_flag: true,
            general_profile_idc: 2,
            general_profile_compatibility_flags: 0x2000_0000,
            general_level_idc: 153,
            general_constraint_indicator_flags: [0xB0, 0, 0, 0, 0, 0],
            ..hevc
        };
        assert_eq!(hevc_codec_description("hev1", &high), "hev1.A02.4.H153.b0");

        let space_three = HevcConfig {
            general_profile_space: 3,
            ..high
        };
        assert_eq!(hevc_codec_description("", &space_three), "hvc1.A22.4.H153.b0");
    }

    #[test]
    fn test_track_without_media_header_is_skipped() {
        let mut file = Mp4Builder::new()
            .faststart(true)
            .track(TrackSpec::avc(640, 360).with_gop_samples(50, 512, 100, 25))
            .track(TrackSpec::aac(44_100, 2).with_uniform_samples(86, 1024, 24))
            .build();

        // the first mdhd in the moov belongs to the video trak
        let moov = file.windows(4).position(|w| w == b"moov").unwrap();
        let mdhd = moov + file[moov..].windows(4).position(|w| w == b"mdhd").unwrap();
        file[mdhd..mdhd + 4].copy_from_slice(b"skip");

        let info = media_info(&file);
        assert_eq!(info.tracks.len(), 1);
        assert_eq!(info.tracks[0].kind(), TrackKind::Audio);
    }

    #[test]
    fn test_build_av_tracks() {
        let file = Mp4Builder::new()
            .track(TrackSpec::avc(1280, 720).with_gop_samples(250, 512, 100, 50))
            .track(TrackSpec::aac(44_100, 2).with_uniform_samples(431, 1024, 24))
            .build();
        let info = media_info(&file);

        assert_eq!(info.tracks.len(), 2);

        let video = info.first_video().unwrap();
        assert_eq!(video.track.track_id, 1);
        assert_eq!(video.track.codec, "avc1");
        assert_eq!(video.track.codec_id, CodecId::Avc1);
        assert_eq!(video.codec_description, "avc1.64001f");
        assert_eq!(video.track.timescale, 12_800);
        // 250 * 512 / 12800 = 10s
        assert_eq!(video.track.duration, 10_000);
        assert_eq!((video.width, video.height), (1280, 720));
        assert!((video.fps - 25.0).abs() < f64::EPSILON);
        assert_eq!(video.track.codec_extra_data.len(), 2);
        assert_eq!(video.track.codec_extra_data[0][0] & 0x1F, 7);
        assert_eq!(video.track.codec_extra_data[1][0], 0x68);
        // 5 keyframes of 300 bytes + 245 frames of 100
        assert_eq!(video.total_size, 5 * 300 + 245 * 100);
        assert_eq!(video.bitrate, 8 * 26_000 / 10_000);

        let audio = info.first_audio().unwrap();
        assert_eq!(audio.track.codec_id, CodecId::Aac);
        assert_eq!(audio.track.language, "eng");
        assert_eq!(audio.codec_description, "mp4a.40.2");
        assert_eq!(audio.track.profile_object_type, Some(2));
        assert_eq!(audio.track.rate_index, Some(4));
        assert_eq!(audio.track.channels_index, Some(2));
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 44_100);
        assert_eq!(audio.track.codec_extra_data, vec![vec![0x12, 0x10]]);
    }

    #[test]
    fn test_duration_falls_back_to_timing_table() {
        let file = Mp4Builder::new()
            .track(
                TrackSpec::avc(640, 360)
                    .with_gop_samples(30, 1001, 10, 10)
                    .timescale(30_000)
                    .duration(0),
            )
            .build();
        let info = media_info(&file);
        let video = info.first_video().unwrap();
        assert_eq!(video.track.duration, rescale(30 * 1001, 30_000, 1000));
        assert_eq!(video.track.duration, 1001);
    }

    #[test]
    fn test_fps_uses_minimum_delta() {
        let samples = [1000u32, 1000, 500, 1000]
            .iter()
            .map(|&duration| FixtureSample {
                duration,
                size: 10,
                is_keyframe: true,
                composition_offset: 0,
            })
            .collect();
        let file = Mp4Builder::new()
            .track(TrackSpec::avc(320, 240).timescale(30_000).with_samples(samples))
            .build();
        let video = media_info(&file).tracks.remove(0);
        assert!((video.fps - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sar_overrides_entry_size() {
        let file = Mp4Builder::new()
            .track(
                TrackSpec::avc(720, 576)
                    .with_sar((16, 11))
                    .with_gop_samples(10, 512, 10, 5),
            )
            .build();
        let video = media_info(&file).tracks.remove(0);
        assert_eq!((video.width, video.height), (1047, 576));
    }

    #[test]
    fn test_hevc_and_other_audio_codecs() {
        let file = Mp4Builder::new()
            .track(TrackSpec::hevc(1920, 1080).with_gop_samples(10, 512, 50, 5))
            .track(TrackSpec::ac3(48_000, 6).with_uniform_samples(10, 1536, 30))
            .track(TrackSpec::mp3(44_100, 2).with_uniform_samples(10, 1152, 30))
            .build();
        let info = media_info(&file);

        let video = info.first_video().unwrap();
        assert_eq!(video.track.codec_id, CodecId::Hevc);
        assert_eq!(video.codec_description, "hvc1.1.6.L93.90");
        assert_eq!(video.track.codec_extra_data.len(), 3);
        assert_eq!((video.width, video.height), (1920, 1080));

        let audio: Vec<_> = info.audio_tracks().collect();
        assert_eq!(audio[0].track.codec_id, CodecId::Ac3);
        assert_eq!(audio[0].codec_description, "ac-3");
        assert_eq!(audio[0].channels, 6);
        assert_eq!(audio[1].track.codec_id, CodecId::Mp3);
        assert!(audio[1].track.profile_object_type.is_none());
    }

    #[test]
    fn test_select_tracks() {
        let file = Mp4Builder::new()
            .track(TrackSpec::avc(640, 360).with_gop_samples(10, 512, 10, 5))
            .track(TrackSpec::aac(48_000, 2).with_uniform_samples(10, 1024, 10))
            .track(TrackSpec::aac(48_000, 1).with_uniform_samples(10, 1024, 10))
            .build();
        let info = media_info(&file);

        let picked = info.select(Some(1), Some(2)).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[1].track.track_id, 3);

        assert!(info.select(None, Some(1)).unwrap()[0].track.is_audio());
        assert!(matches!(
            info.select(Some(2), None),
            Err(Error::TrackNotFound { kind: "video", index: 2 })
        ));
        assert!(matches!(
            info.select(None, Some(0)),
            Err(Error::TrackNotFound { kind: "audio", index: 0 })
        ));
    }

    #[test]
    fn test_materialize_keeps_metadata() {
        let file = Mp4Builder::new()
            .large_offsets(true)
            .track(TrackSpec::avc(640, 360).with_gop_samples(20, 512, 10, 10))
            .build();
        let info = media_info(&file);
        let track = info.tracks[0].materialize();

        assert_eq!(track.samples.len(), 20);
        assert!(track.samples[0].is_keyframe);
        assert!(track.samples[10].is_keyframe);
        assert!(!track.samples[11].is_keyframe);
        assert_eq!(track.samples[19].dts, 19 * 512);
        // samples are contiguous in mdat
        for pair in track.samples.windows(2) {
            assert_eq!(pair[0].offset + pair[0].size as u64, pair[1].offset);
        }
        assert!(info.tracks[0].track.samples.is_empty());
    }

    #[test]
    fn test_empty_movie() {
        let file = Mp4Builder::new().build();
        assert!(media_info(&file).tracks.is_empty());
    }
}
