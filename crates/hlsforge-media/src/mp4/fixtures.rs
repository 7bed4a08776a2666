//! In-memory MP4 files for tests and benchmarks.
//!
//! Builds `ftyp` + `moov` + `mdat` with real sample tables, codec
//! configuration boxes and length-prefixed NAL payloads, so everything from
//! box decoding to TS packetization can run against it.

use super::sps::build_sps;
use bytes::{BufMut, BytesMut};

/// One sample to lay out in `mdat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureSample {
    pub duration: u32,
    pub size: u32,
    pub is_keyframe: bool,
    pub composition_offset: i32,
}

/// Codec written into the sample description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureCodec {
    Avc {
        width: u16,
        height: u16,
        level: u8,
        sar: Option<(u16, u16)>,
    },
    Hevc {
        width: u16,
        height: u16,
    },
    Aac {
        sample_rate: u32,
        channels: u16,
    },
    Mp3 {
        sample_rate: u32,
        channels: u16,
    },
    Ac3 {
        sample_rate: u32,
        channels: u16,
    },
}

impl FixtureCodec {
    fn is_video(&self) -> bool {
        matches!(self, Self::Avc { .. } | Self::Hevc { .. })
    }
}

/// A track to write.
#[derive(Debug, Clone)]
pub struct TrackSpec {
    pub codec: FixtureCodec,
    pub timescale: u32,
    /// `mdhd` duration; the sum of sample durations when `None`.
    pub duration: Option<u64>,
    pub language: &'static str,
    pub samples: Vec<FixtureSample>,
    pub samples_per_chunk: u32,
    /// Write an `stss` box. Without one every sample is a sync sample.
    pub write_stss: bool,
}

impl TrackSpec {
    fn new(codec: FixtureCodec, timescale: u32, language: &'static str) -> Self {
        let is_video = codec.is_video();
        Self {
            codec,
            timescale,
            duration: None,
            language,
            samples: Vec::new(),
            samples_per_chunk: if is_video { 10 } else { 20 },
            write_stss: is_video,
        }
    }

    /// H.264 High profile, level 3.1, 12800 Hz timescale.
    pub fn avc(width: u16, height: u16) -> Self {
        Self::new(
            FixtureCodec::Avc {
                width,
                height,
                level: 0x1f,
                sar: None,
            },
            12_800,
            "und",
        )
    }

    /// HEVC Main profile, 12800 Hz timescale.
    pub fn hevc(width: u16, height: u16) -> Self {
        Self::new(FixtureCodec::Hevc { width, height }, 12_800, "und")
    }

    /// AAC-LC with the timescale equal to the sample rate.
    pub fn aac(sample_rate: u32, channels: u16) -> Self {
        Self::new(
            FixtureCodec::Aac {
                sample_rate,
                channels,
            },
            sample_rate,
            "eng",
        )
    }

    pub fn mp3(sample_rate: u32, channels: u16) -> Self {
        Self::new(
            FixtureCodec::Mp3 {
                sample_rate,
                channels,
            },
            sample_rate,
            "eng",
        )
    }

    pub fn ac3(sample_rate: u32, channels: u16) -> Self {
        Self::new(
            FixtureCodec::Ac3 {
                sample_rate,
                channels,
            },
            sample_rate,
            "eng",
        )
    }

    /// `count` samples of `delta` ticks with a keyframe every `gop` samples.
    /// Keyframes are three times `size` bytes.
    pub fn with_gop_samples(mut self, count: u32, delta: u32, size: u32, gop: u32) -> Self {
        self.samples = (0..count)
            .map(|i| {
                let is_keyframe = i % gop == 0;
                FixtureSample {
                    duration: delta,
                    size: if is_keyframe { size * 3 } else { size },
                    is_keyframe,
                    composition_offset: 0,
                }
            })
            .collect();
        self
    }

    /// `count` identical samples, all sync samples.
    pub fn with_uniform_samples(mut self, count: u32, delta: u32, size: u32) -> Self {
        self.samples = (0..count)
            .map(|_| FixtureSample {
                duration: delta,
                size,
                is_keyframe: true,
                composition_offset: 0,
            })
            .collect();
        self
    }

    pub fn with_samples(mut self, samples: Vec<FixtureSample>) -> Self {
        self.samples = samples;
        self
    }

    pub fn timescale(mut self, timescale: u32) -> Self {
        self.timescale = timescale;
        self
    }

    pub fn duration(mut self, duration: u64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn language(mut self, language: &'static str) -> Self {
        self.language = language;
        self
    }

    pub fn samples_per_chunk(mut self, samples_per_chunk: u32) -> Self {
        self.samples_per_chunk = samples_per_chunk.max(1);
        self
    }

    pub fn write_stss(mut self, write_stss: bool) -> Self {
        self.write_stss = write_stss;
        self
    }

    pub fn with_sar(mut self, sar: (u16, u16)) -> Self {
        if let FixtureCodec::Avc { sar: s, .. } = &mut self.codec {
            *s = Some(sar);
        }
        self
    }

    fn media_duration(&self) -> u64 {
        self.duration.unwrap_or_else(|| {
            self.samples.iter().map(|s| s.duration as u64).sum()
        })
    }

    fn chunk_count(&self) -> usize {
        self.samples.len().div_ceil(self.samples_per_chunk as usize)
    }

    /// Bytes of one sample as stored in `mdat`.
    pub fn sample_bytes(&self, sample: &FixtureSample, index: usize) -> Vec<u8> {
        let size = sample.size as usize;
        let fill = (index % 251) as u8;
        let nal_header: &[u8] = match (&self.codec, sample.is_keyframe) {
            (FixtureCodec::Avc { .. }, true) => &[0x65],
            (FixtureCodec::Avc { .. }, false) => &[0x41],
            (FixtureCodec::Hevc { .. }, true) => &[0x26, 0x01],
            (FixtureCodec::Hevc { .. }, false) => &[0x02, 0x01],
            _ => &[],
        };

        if nal_header.is_empty() || size < 4 + nal_header.len() {
            return vec![fill; size];
        }

        let mut bytes = Vec::with_capacity(size);
        bytes.extend_from_slice(&((size - 4) as u32).to_be_bytes());
        bytes.extend_from_slice(nal_header);
        bytes.resize(size, fill);
        bytes
    }
}

/// Writes a complete MP4 file.
#[derive(Debug, Clone)]
pub struct Mp4Builder {
    tracks: Vec<TrackSpec>,
    faststart: bool,
    large_offsets: bool,
}

impl Default for Mp4Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Mp4Builder {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            faststart: true,
            large_offsets: false,
        }
    }

    /// Place `moov` before `mdat` (default) or after it.
    pub fn faststart(mut self, faststart: bool) -> Self {
        self.faststart = faststart;
        self
    }

    /// Write `co64` instead of `stco`.
    pub fn large_offsets(mut self, large_offsets: bool) -> Self {
        self.large_offsets = large_offsets;
        self
    }

    pub fn track(mut self, track: TrackSpec) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut ftyp = BytesMut::new();
        write_ftyp(&mut ftyp);

        // Offsets do not change the moov size, so size it with zeros first.
        let zero_offsets: Vec<Vec<u64>> = self
            .tracks
            .iter()
            .map(|t| vec![0; t.chunk_count()])
            .collect();
        let moov_len = self.write_moov(&zero_offsets).len();

        let mut cursor = if self.faststart {
            (ftyp.len() + moov_len + 8) as u64
        } else {
            (ftyp.len() + 8) as u64
        };

        let mut chunk_offsets = Vec::with_capacity(self.tracks.len());
        let mut mdat = BytesMut::new();
        mdat.put_u32(0);
        mdat.put_slice(b"mdat");

        for track in &self.tracks {
            let mut offsets = Vec::with_capacity(track.chunk_count());
            for (chunk_index, chunk) in track
                .samples
                .chunks(track.samples_per_chunk as usize)
                .enumerate()
            {
                offsets.push(cursor);
                for (i, sample) in chunk.iter().enumerate() {
                    let index = chunk_index * track.samples_per_chunk as usize + i;
                    mdat.put_slice(&track.sample_bytes(sample, index));
                    cursor += sample.size as u64;
                }
            }
            chunk_offsets.push(offsets);
        }
        let mdat_len = mdat.len() as u32;
        mdat[0..4].copy_from_slice(&mdat_len.to_be_bytes());

        let moov = self.write_moov(&chunk_offsets);

        let mut file = BytesMut::with_capacity(ftyp.len() + moov.len() + mdat.len());
        file.put_slice(&ftyp);
        if self.faststart {
            file.put_slice(&moov);
            file.put_slice(&mdat);
        } else {
            file.put_slice(&mdat);
            file.put_slice(&moov);
        }
        file.to_vec()
    }

    fn write_moov(&self, chunk_offsets: &[Vec<u64>]) -> BytesMut {
        let mut buf = BytesMut::new();
        let moov = begin_box(&mut buf, b"moov");

        let movie_duration = self
            .tracks
            .iter()
            .map(|t| crate::time::rescale(t.media_duration(), t.timescale, 1000))
            .max()
            .unwrap_or(0);
        write_mvhd(&mut buf, movie_duration, self.tracks.len() as u32 + 1);

        for (i, track) in self.tracks.iter().enumerate() {
            self.write_trak(&mut buf, track, i as u32 + 1, &chunk_offsets[i]);
        }

        end_box(&mut buf, moov);
        buf
    }

    fn write_trak(&self, buf: &mut BytesMut, track: &TrackSpec, track_id: u32, offsets: &[u64]) {
        let trak = begin_box(buf, b"trak");
        write_tkhd(buf, track, track_id);

        let mdia = begin_box(buf, b"mdia");
        write_mdhd(buf, track);
        if track.codec.is_video() {
            write_hdlr(buf, b"vide", b"VideoHandler");
        } else {
            write_hdlr(buf, b"soun", b"SoundHandler");
        }

        let minf = begin_box(buf, b"minf");
        if track.codec.is_video() {
            buf.put_u32(20);
            buf.put_slice(b"vmhd");
            buf.put_u32(1); // version/flags
            buf.put_u16(0); // graphics mode
            buf.put_slice(&[0; 6]); // opcolor
        } else {
            buf.put_u32(16);
            buf.put_slice(b"smhd");
            buf.put_u32(0);
            buf.put_u16(0); // balance
            buf.put_u16(0);
        }
        write_dinf(buf);

        let stbl = begin_box(buf, b"stbl");
        write_stsd(buf, track);
        write_stts(buf, track);
        if track.samples.iter().any(|s| s.composition_offset != 0) {
            write_ctts(buf, track);
        }
        if track.write_stss {
            write_stss(buf, track);
        }
        write_stsc(buf, track);
        write_stsz(buf, track);
        if self.large_offsets {
            write_full_box_header(buf, b"co64", 16 + offsets.len() * 8);
            buf.put_u32(offsets.len() as u32);
            for &offset in offsets {
                buf.put_u64(offset);
            }
        } else {
            write_full_box_header(buf, b"stco", 16 + offsets.len() * 4);
            buf.put_u32(offsets.len() as u32);
            for &offset in offsets {
                buf.put_u32(offset as u32);
            }
        }
        end_box(buf, stbl);

        end_box(buf, minf);
        end_box(buf, mdia);
        end_box(buf, trak);
    }
}

fn begin_box(buf: &mut BytesMut, box_type: &[u8; 4]) -> usize {
    let start = buf.len();
    buf.put_u32(0); // placeholder size
    buf.put_slice(box_type);
    start
}

fn end_box(buf: &mut BytesMut, start: usize) {
    let size = (buf.len() - start) as u32;
    buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
}

/// Header of a version 0 full box with a known total size.
fn write_full_box_header(buf: &mut BytesMut, box_type: &[u8; 4], size: usize) {
    buf.put_u32(size as u32);
    buf.put_slice(box_type);
    buf.put_u32(0); // version/flags
}

fn write_ftyp(buf: &mut BytesMut) {
    buf.put_u32(32);
    buf.put_slice(b"ftyp");
    buf.put_slice(b"isom"); // major brand
    buf.put_u32(0x200); // minor version
    for brand in [b"isom", b"iso2", b"avc1", b"mp41"] {
        buf.put_slice(brand);
    }
}

fn write_matrix(buf: &mut BytesMut) {
    for value in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        buf.put_u32(value);
    }
}

fn write_mvhd(buf: &mut BytesMut, duration_ms: u64, next_track_id: u32) {
    write_full_box_header(buf, b"mvhd", 108);
    buf.put_u32(0); // creation time
    buf.put_u32(0); // modification time
    buf.put_u32(1000);
    buf.put_u32(duration_ms as u32);
    buf.put_u32(0x0001_0000); // rate = 1.0
    buf.put_u16(0x0100); // volume = 1.0
    buf.put_slice(&[0; 10]);
    write_matrix(buf);
    buf.put_slice(&[0; 24]); // pre-defined
    buf.put_u32(next_track_id);
}

fn write_tkhd(buf: &mut BytesMut, track: &TrackSpec, track_id: u32) {
    write_full_box_header(buf, b"tkhd", 92);
    buf.put_u32(0); // creation time
    buf.put_u32(0); // modification time
    buf.put_u32(track_id);
    buf.put_u32(0); // reserved
    buf.put_u32(track.media_duration() as u32);
    buf.put_u64(0); // reserved
    buf.put_u16(0); // layer
    buf.put_u16(0); // alternate group
    buf.put_u16(if track.codec.is_video() { 0 } else { 0x0100 });
    buf.put_u16(0);
    write_matrix(buf);
    let (width, height) = match track.codec {
        FixtureCodec::Avc { width, height, .. } | FixtureCodec::Hevc { width, height } => {
            (width as u32, height as u32)
        }
        _ => (0, 0),
    };
    buf.put_u32(width << 16);
    buf.put_u32(height << 16);
}

fn write_mdhd(buf: &mut BytesMut, track: &TrackSpec) {
    let lang = track.language.as_bytes();
    let packed = lang
        .iter()
        .take(3)
        .fold(0u16, |acc, &c| (acc << 5) | ((c - 0x60) as u16 & 0x1F));

    let duration = track.media_duration();
    if duration > u32::MAX as u64 {
        buf.put_u32(44);
        buf.put_slice(b"mdhd");
        buf.put_u32(0x0100_0000); // version 1
        buf.put_u64(0);
        buf.put_u64(0);
        buf.put_u32(track.timescale);
        buf.put_u64(duration);
    } else {
        write_full_box_header(buf, b"mdhd", 32);
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32(track.timescale);
        buf.put_u32(duration as u32);
    }
    buf.put_u16(packed);
    buf.put_u16(0); // pre_defined
}

fn write_hdlr(buf: &mut BytesMut, handler: &[u8; 4], name: &[u8]) {
    write_full_box_header(buf, b"hdlr", 32 + name.len() + 1);
    buf.put_u32(0); // pre_defined
    buf.put_slice(handler);
    buf.put_slice(&[0; 12]);
    buf.put_slice(name);
    buf.put_u8(0);
}

fn write_dinf(buf: &mut BytesMut) {
    let dinf = begin_box(buf, b"dinf");
    write_full_box_header(buf, b"dref", 28);
    buf.put_u32(1);
    buf.put_u32(12);
    buf.put_slice(b"url ");
    buf.put_u32(1); // self-contained
    end_box(buf, dinf);
}

fn write_stsd(buf: &mut BytesMut, track: &TrackSpec) {
    let stsd = begin_box(buf, b"stsd");
    buf.put_u32(0);
    buf.put_u32(1);

    match track.codec {
        FixtureCodec::Avc {
            width,
            height,
            level,
            sar,
        } => {
            let entry = begin_visual_entry(buf, b"avc1", width, height);
            let sps = build_sps(level, width as u32, height as u32, sar);
            let pps = [0x68, 0xEE, 0x3C, 0x80];
            let avcc = begin_box(buf, b"avcC");
            buf.put_slice(&[1, sps[1], sps[2], sps[3], 0xFF, 0xE1]);
            buf.put_u16(sps.len() as u16);
            buf.put_slice(&sps);
            buf.put_u8(1);
            buf.put_u16(pps.len() as u16);
            buf.put_slice(&pps);
            end_box(buf, avcc);
            end_box(buf, entry);
        }
        FixtureCodec::Hevc { width, height } => {
            let entry = begin_visual_entry(buf, b"hvc1", width, height);
            let hvcc = begin_box(buf, b"hvcC");
            buf.put_u8(1);
            buf.put_u8(0x01); // main tier, Main profile
            buf.put_u32(0x6000_0000);
            buf.put_slice(&[0x90, 0, 0, 0, 0, 0]);
            buf.put_u8(93); // level 3.1
            buf.put_u16(0xF000);
            buf.put_u8(0xFC);
            buf.put_u8(0xFD); // 4:2:0
            buf.put_u8(0xF8);
            buf.put_u8(0xF8);
            buf.put_u16(0);
            buf.put_u8(0x0F); // 4 byte NAL lengths
            let arrays: [(u8, &[u8]); 3] = [
                (32, &[0x40, 0x01, 0x0C]),
                (33, &[0x42, 0x01, 0x01]),
                (34, &[0x44, 0x01, 0xC0]),
            ];
            buf.put_u8(arrays.len() as u8);
            for (nal_type, unit) in arrays {
                buf.put_u8(0x80 | nal_type);
                buf.put_u16(1);
                buf.put_u16(unit.len() as u16);
                buf.put_slice(unit);
            }
            end_box(buf, hvcc);
            end_box(buf, entry);
        }
        FixtureCodec::Aac {
            sample_rate,
            channels,
        } => {
            let entry = begin_audio_entry(buf, b"mp4a", sample_rate, channels);
            let rate_index = AAC_SAMPLE_RATES
                .iter()
                .position(|&r| r == sample_rate)
                .unwrap_or(4) as u16;
            let asc = (2u16 << 11) | (rate_index << 7) | ((channels & 0x0F) << 3);
            write_esds(buf, 0x40, &asc.to_be_bytes());
            end_box(buf, entry);
        }
        FixtureCodec::Mp3 {
            sample_rate,
            channels,
        } => {
            let entry = begin_audio_entry(buf, b"mp4a", sample_rate, channels);
            write_esds(buf, 0x6B, &[]);
            end_box(buf, entry);
        }
        FixtureCodec::Ac3 {
            sample_rate,
            channels,
        } => {
            let entry = begin_audio_entry(buf, b"ac-3", sample_rate, channels);
            buf.put_u32(11);
            buf.put_slice(b"dac3");
            buf.put_slice(&[0x10, 0x3D, 0xC0]);
            end_box(buf, entry);
        }
    }

    end_box(buf, stsd);
}

const AAC_SAMPLE_RATES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
    8_000, 7_350,
];

fn begin_visual_entry(buf: &mut BytesMut, format: &[u8; 4], width: u16, height: u16) -> usize {
    let entry = begin_box(buf, format);
    buf.put_slice(&[0; 6]);
    buf.put_u16(1); // data reference index
    buf.put_slice(&[0; 16]);
    buf.put_u16(width);
    buf.put_u16(height);
    buf.put_u32(0x0048_0000); // 72 dpi
    buf.put_u32(0x0048_0000);
    buf.put_u32(0);
    buf.put_u16(1); // frame count
    buf.put_slice(&[0; 32]); // compressor name
    buf.put_u16(0x0018); // depth
    buf.put_u16(0xFFFF);
    entry
}

fn begin_audio_entry(buf: &mut BytesMut, format: &[u8; 4], sample_rate: u32, channels: u16) -> usize {
    let entry = begin_box(buf, format);
    buf.put_slice(&[0; 6]);
    buf.put_u16(1); // data reference index
    buf.put_slice(&[0; 8]); // version, revision, vendor
    buf.put_u16(channels);
    buf.put_u16(16); // sample size
    buf.put_u32(0); // compression id, packet size
    buf.put_u32(sample_rate << 16);
    entry
}

fn write_esds(buf: &mut BytesMut, object_type: u8, specific_info: &[u8]) {
    let dsi_len = if specific_info.is_empty() {
        0
    } else {
        2 + specific_info.len()
    };
    let config_len = 13 + dsi_len;
    let es_len = 3 + 2 + config_len + 3;

    let esds = begin_box(buf, b"esds");
    buf.put_u32(0);
    buf.put_slice(&[0x03, es_len as u8]);
    buf.put_u16(1); // ES_ID
    buf.put_u8(0);
    buf.put_slice(&[0x04, config_len as u8]);
    buf.put_u8(object_type);
    buf.put_u8(0x15); // audio stream
    buf.put_slice(&[0; 3]); // buffer size
    buf.put_u32(128_000);
    buf.put_u32(128_000);
    if !specific_info.is_empty() {
        buf.put_slice(&[0x05, specific_info.len() as u8]);
        buf.put_slice(specific_info);
    }
    buf.put_slice(&[0x06, 0x01, 0x02]);
    end_box(buf, esds);
}

fn write_stts(buf: &mut BytesMut, track: &TrackSpec) {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for sample in &track.samples {
        match runs.last_mut() {
            Some((count, delta)) if *delta == sample.duration => *count += 1,
            _ => runs.push((1, sample.duration)),
        }
    }
    write_full_box_header(buf, b"stts", 16 + runs.len() * 8);
    buf.put_u32(runs.len() as u32);
    for (count, delta) in runs {
        buf.put_u32(count);
        buf.put_u32(delta);
    }
}

fn write_ctts(buf: &mut BytesMut, track: &TrackSpec) {
    let mut runs: Vec<(u32, i32)> = Vec::new();
    for sample in &track.samples {
        match runs.last_mut() {
            Some((count, offset)) if *offset == sample.composition_offset => *count += 1,
            _ => runs.push((1, sample.composition_offset)),
        }
    }
    write_full_box_header(buf, b"ctts", 16 + runs.len() * 8);
    buf.put_u32(runs.len() as u32);
    for (count, offset) in runs {
        buf.put_u32(count);
        buf.put_i32(offset);
    }
}

fn write_stss(buf: &mut BytesMut, track: &TrackSpec) {
    let sync: Vec<u32> = track
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_keyframe)
        .map(|(i, _)| i as u32 + 1)
        .collect();
    write_full_box_header(buf, b"stss", 16 + sync.len() * 4);
    buf.put_u32(sync.len() as u32);
    for number in sync {
        buf.put_u32(number);
    }
}

fn write_stsc(buf: &mut BytesMut, track: &TrackSpec) {
    let spc = track.samples_per_chunk;
    let chunks = track.chunk_count() as u32;
    let remainder = track.samples.len() as u32 % spc;

    let mut entries = vec![(1, spc)];
    if remainder != 0 && chunks > 1 {
        entries.push((chunks, remainder));
    } else if remainder != 0 {
        entries[0].1 = remainder;
    }

    write_full_box_header(buf, b"stsc", 16 + entries.len() * 12);
    buf.put_u32(entries.len() as u32);
    for (first_chunk, samples_per_chunk) in entries {
        buf.put_u32(first_chunk);
        buf.put_u32(samples_per_chunk);
        buf.put_u32(1);
    }
}

fn write_stsz(buf: &mut BytesMut, track: &TrackSpec) {
    let first = track.samples.first().map(|s| s.size).unwrap_or(0);
    let uniform = first != 0 && track.samples.iter().all(|s| s.size == first);

    if uniform {
        write_full_box_header(buf, b"stsz", 20);
        buf.put_u32(first);
        buf.put_u32(track.samples.len() as u32);
    } else {
        write_full_box_header(buf, b"stsz", 20 + track.samples.len() * 4);
        buf.put_u32(0);
        buf.put_u32(track.samples.len() as u32);
        for sample in &track.samples {
            buf.put_u32(sample.size);
        }
    }
}

/// A muxed file: 25 fps H.264 with 2 s GOPs plus 44.1 kHz stereo AAC.
pub fn av_fixture(seconds: u32) -> Vec<u8> {
    let frames = seconds * 25;
    let audio_frames = (seconds as u64 * 44_100).div_ceil(1024) as u32;
    Mp4Builder::new()
        .track(TrackSpec::avc(1280, 720).with_gop_samples(frames, 512, 100, 50))
        .track(TrackSpec::aac(44_100, 2).with_uniform_samples(audio_frames, 1024, 24))
        .build()
}
