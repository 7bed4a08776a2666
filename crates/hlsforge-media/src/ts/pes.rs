//! PES packets and elementary stream framing.

/// PES start code prefix.
pub const PES_START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

/// Stream ids used by the packetizer.
pub mod stream_id {
    pub const PRIVATE_STREAM_1: u8 = 0xBD;
    pub const AUDIO: u8 = 0xC0;
    pub const VIDEO: u8 = 0xE0;
}

/// 33-bit mask of PTS/DTS values.
pub const TIMESTAMP_MASK: u64 = (1 << 33) - 1;

const ANNEXB_START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Write a 90 kHz timestamp in the 5-byte PES layout.
///
/// `prefix` is 0x20 for PTS only, 0x30 for PTS followed by DTS and 0x10 for
/// the DTS.
pub fn write_timestamp(out: &mut Vec<u8>, prefix: u8, value: u64) {
    let value = value & TIMESTAMP_MASK;
    out.push(prefix | ((((value >> 30) as u8) & 0x07) << 1) | 0x01);
    out.push((value >> 22) as u8);
    out.push((((value >> 15) & 0x7F) << 1) as u8 | 0x01);
    out.push((value >> 7) as u8);
    out.push(((value & 0x7F) << 1) as u8 | 0x01);
}

/// Build a PES header for a payload of `payload_len` bytes.
///
/// DTS is only written when it differs from PTS. The packet length field is
/// left at zero for video and whenever it would not fit in 16 bits.
pub fn pes_header(stream_id: u8, pts: u64, dts: Option<u64>, payload_len: usize) -> Vec<u8> {
    let dts = dts.filter(|&d| d != pts);
    let header_data_length: u8 = if dts.is_some() { 10 } else { 5 };

    let packet_length = 3 + header_data_length as usize + payload_len;
    let packet_length = if stream_id == stream_id::VIDEO || packet_length > 0xFFFF {
        0
    } else {
        packet_length as u16
    };

    let mut out = Vec::with_capacity(9 + header_data_length as usize);
    out.extend_from_slice(&PES_START_CODE_PREFIX);
    out.push(stream_id);
    out.extend_from_slice(&packet_length.to_be_bytes());
    // '10' marker, data_alignment_indicator
    out.push(0x84);
    out.push(if dts.is_some() { 0xC0 } else { 0x80 });
    out.push(header_data_length);
    match dts {
        Some(dts) => {
            write_timestamp(&mut out, 0x30, pts);
            write_timestamp(&mut out, 0x10, dts);
        }
        None => write_timestamp(&mut out, 0x20, pts),
    }
    out
}

/// 7-byte ADTS header (no CRC) for an AAC frame of `payload_len` bytes.
///
/// `object_type` is the AudioSpecificConfig object type; types outside
/// Main/LC/SSR/LTP (e.g. HE-AAC) are signalled as LC.
pub fn adts_header(object_type: u8, rate_index: u8, channels: u8, payload_len: usize) -> [u8; 7] {
    let profile = match object_type {
        1..=4 => object_type - 1,
        _ => 1,
    };
    let frame_length = payload_len + 7;

    [
        0xFF,
        0xF1,
        (profile << 6) | ((rate_index & 0x0F) << 2) | ((channels >> 2) & 0x01),
        ((channels & 0x03) << 6) | ((frame_length >> 11) as u8 & 0x03),
        (frame_length >> 3) as u8,
        (((frame_length & 0x07) as u8) << 5) | 0x1F,
        0xFC,
    ]
}

/// Video bitstream flavour, for NAL unit types that differ between codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalFormat {
    Avc,
    Hevc,
}

impl NalFormat {
    fn access_unit_delimiter(&self) -> &'static [u8] {
        match self {
            Self::Avc => &[0x09, 0xF0],
            Self::Hevc => &[0x46, 0x01, 0x50],
        }
    }

    fn is_access_unit_delimiter(&self, nal: &[u8]) -> bool {
        match (self, nal.first()) {
            (Self::Avc, Some(b)) => b & 0x1F == 9,
            (Self::Hevc, Some(b)) => (b >> 1) & 0x3F == 35,
            _ => false,
        }
    }
}

/// Convert a length-prefixed sample to Annex-B.
///
/// An access unit delimiter is emitted first, followed by `parameter_sets`
/// (pass them on keyframes) and the sample's NAL units. Delimiters already
/// present in the sample are dropped. A truncated trailing NAL unit ends the
/// conversion.
pub fn to_annexb(
    sample: &[u8],
    nal_length_size: u8,
    format: NalFormat,
    parameter_sets: &[Vec<u8>],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(sample.len() + 64);
    out.extend_from_slice(&ANNEXB_START_CODE);
    out.extend_from_slice(format.access_unit_delimiter());

    for nal in parameter_sets {
        out.extend_from_slice(&ANNEXB_START_CODE);
        out.extend_from_slice(nal);
    }

    let size_len = nal_length_size.clamp(1, 4) as usize;
    let mut pos = 0;
    while pos + size_len <= sample.len() {
        let len = sample[pos..pos + size_len]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        pos += size_len;
        let Some(nal) = sample.get(pos..pos + len) else {
            tracing::warn!(len, remaining = sample.len() - pos, "Truncated NAL unit");
            break;
        };
        pos += len;
        if nal.is_empty() || format.is_access_unit_delimiter(nal) {
            continue;
        }
        out.extend_from_slice(&ANNEXB_START_CODE);
        out.extend_from_slice(nal);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_timestamp() {
        let mut out = Vec::new();
        write_timestamp(&mut out, 0x20, 0);
        assert_eq!(out, [0x21, 0x00, 0x01, 0x00, 0x01]);

        let mut out = Vec::new();
        write_timestamp(&mut out, 0x10, TIMESTAMP_MASK);
        assert_eq!(out, [0x1F, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_pes_header_pts_only() {
        let header = pes_header(stream_id::AUDIO, 90_000, Some(90_000), 100);
        assert_eq!(header.len(), 14);
        assert_eq!(&header[..4], &[0x00, 0x00, 0x01, 0xC0]);
        assert_eq!(u16::from_be_bytes([header[4], header[5]]), 3 + 5 + 100);
        assert_eq!(header[7], 0x80);
        assert_eq!(header[8], 5);
        assert_eq!(header[9] & 0xF0, 0x20);
    }

    #[test]
    fn test_pes_header_pts_dts() {
        let header = pes_header(stream_id::VIDEO, 93_600, Some(90_000), 100_000);
        assert_eq!(header.len(), 19);
        assert_eq!(&header[4..6], &[0, 0]);
        assert_eq!(header[7], 0xC0);
        assert_eq!(header[8], 10);
        assert_eq!(header[9] & 0xF0, 0x30);
        assert_eq!(header[14] & 0xF0, 0x10);
    }

    #[test]
    fn test_adts_header() {
        assert_eq!(
            adts_header(2, 4, 2, 24),
            [0xFF, 0xF1, 0x50, 0x80, 0x03, 0xFF, 0xFC]
        );
        // HE-AAC is signalled as LC
        assert_eq!(adts_header(5, 6, 1, 0)[2] >> 6, 1);
    }

    #[test]
    fn test_to_annexb() {
        let sample = [
            0, 0, 0, 2, 0x09, 0xF0, // AUD, dropped
            0, 0, 0, 3, 0x65, 0xAA, 0xBB, // IDR slice
            0, 0, 0, 2, 0x41, 0xCC, // slice
        ];
        let sps = vec![0x67, 0x64];
        let out = to_annexb(&sample, 4, NalFormat::Avc, &[sps]);
        assert_eq!(
            out,
            [
                0, 0, 0, 1, 0x09, 0xF0, //
                0, 0, 0, 1, 0x67, 0x64, //
                0, 0, 0, 1, 0x65, 0xAA, 0xBB, //
                0, 0, 0, 1, 0x41, 0xCC,
            ]
        );
    }

    #[test]
    fn test_to_annexb_truncated_and_hevc() {
        let sample = [0, 2, 0x26, 0x01, 0, 9, 0x02];
        let out = to_annexb(&sample, 2, NalFormat::Hevc, &[]);
        assert_eq!(out, [0, 0, 0, 1, 0x46, 0x01, 0x50, 0, 0, 0, 1, 0x26, 0x01]);
    }
}
