//! Decoder configuration records carried inside sample entries.
//!
//! `avcC` (ISO/IEC 14496-15 5.3.3), `hvcC` (14496-15 8.3.3) and the `esds`
//! descriptor tree (14496-1 7.2.6).

use super::sps::{parse_sps, SpsInfo};

/// Parsed `avcC` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcConfig {
    pub configuration_version: u8,
    pub profile_indication: u8,
    pub profile_compatibility: u8,
    pub level_indication: u8,
    /// Size in bytes of the NAL unit length prefix in samples.
    pub nal_length_size: u8,
    pub sequence_parameter_sets: Vec<Vec<u8>>,
    pub picture_parameter_sets: Vec<Vec<u8>>,
    /// Dimensions from the first SPS that parsed.
    pub sps_info: Option<SpsInfo>,
}

impl AvcConfig {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 7 {
            return None;
        }

        let mut pos = 5;
        let sps_count = (data[pos] & 0x1F) as usize;
        pos += 1;
        let sequence_parameter_sets = read_length_prefixed(data, &mut pos, sps_count)?;

        let pps_count = *data.get(pos)? as usize;
        pos += 1;
        let picture_parameter_sets = read_length_prefixed(data, &mut pos, pps_count)?;

        let sps_info = sequence_parameter_sets
            .iter()
            .find_map(|sps| parse_sps(sps));

        Some(Self {
            configuration_version: data[0],
            profile_indication: data[1],
            profile_compatibility: data[2],
            level_indication: data[3],
            nal_length_size: (data[4] & 0x03) + 1,
            sequence_parameter_sets,
            picture_parameter_sets,
            sps_info,
        })
    }
}

/// One NAL unit array from an `hvcC` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcNalArray {
    pub array_completeness: bool,
    pub nal_unit_type: u8,
    pub nal_units: Vec<Vec<u8>>,
}

/// Parsed `hvcC` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcConfig {
    pub configuration_version: u8,
    pub general_profile_space: u8,
    pub general_tier_flag: bool,
    pub general_profile_idc: u8,
    pub general_profile_compatibility_flags: u32,
    pub general_constraint_indicator_flags: [u8; 6],
    pub general_level_idc: u8,
    pub nal_length_size: u8,
    pub arrays: Vec<HevcNalArray>,
}

impl HevcConfig {
    const FIXED_SIZE: usize = 23;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::FIXED_SIZE {
            return None;
        }

        let mut constraint = [0u8; 6];
        constraint.copy_from_slice(&data[6..12]);

        let num_arrays = data[22] as usize;
        let mut pos = Self::FIXED_SIZE;
        let mut arrays = Vec::with_capacity(num_arrays);
        for _ in 0..num_arrays {
            let header = *data.get(pos)?;
            let count = u16::from_be_bytes([*data.get(pos + 1)?, *data.get(pos + 2)?]) as usize;
            pos += 3;
            let nal_units = read_length_prefixed(data, &mut pos, count)?;
            arrays.push(HevcNalArray {
                array_completeness: header & 0x80 != 0,
                nal_unit_type: header & 0x3F,
                nal_units,
            });
        }

        Some(Self {
            configuration_version: data[0],
            general_profile_space: data[1] >> 6,
            general_tier_flag: data[1] & 0x20 != 0,
            general_profile_idc: data[1] & 0x1F,
            general_profile_compatibility_flags: u32::from_be_bytes([
                data[2], data[3], data[4], data[5],
            ]),
            general_constraint_indicator_flags: constraint,
            general_level_idc: data[12],
            nal_length_size: (data[21] & 0x03) + 1,
            arrays,
        })
    }

    /// All NAL units that carry a payload, in array order.
    pub fn nal_units(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.arrays
            .iter()
            .flat_map(|array| array.nal_units.iter())
            .filter(|unit| !unit.is_empty())
    }
}

fn read_length_prefixed(data: &[u8], pos: &mut usize, count: usize) -> Option<Vec<Vec<u8>>> {
    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        let len = u16::from_be_bytes([*data.get(*pos)?, *data.get(*pos + 1)?]) as usize;
        *pos += 2;
        units.push(data.get(*pos..*pos + len)?.to_vec());
        *pos += len;
    }
    Some(units)
}

/// Descriptor tags used in `esds`.
pub mod tag {
    pub const ES: u8 = 0x03;
    pub const DECODER_CONFIG: u8 = 0x04;
    pub const DECODER_SPECIFIC_INFO: u8 = 0x05;
    pub const SL_CONFIG: u8 = 0x06;
}

/// A node in the MPEG-4 descriptor tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Es {
        es_id: u16,
        children: Vec<Descriptor>,
    },
    DecoderConfig {
        object_type_indication: u8,
        stream_type: u8,
        max_bitrate: u32,
        avg_bitrate: u32,
        children: Vec<Descriptor>,
    },
    DecoderSpecificInfo(Vec<u8>),
    SlConfig {
        predefined: u8,
    },
    Unknown {
        tag: u8,
    },
}

impl Descriptor {
    fn children(&self) -> &[Descriptor] {
        match self {
            Self::Es { children, .. } | Self::DecoderConfig { children, .. } => children.as_slice(),
            _ => &[],
        }
    }

    /// Depth-first search for the first descriptor matching `pred`.
    pub fn find(&self, pred: &impl Fn(&Descriptor) -> bool) -> Option<&Descriptor> {
        if pred(self) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(pred))
    }
}

/// Parsed `esds` box: the descriptor list following the full box header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsDescriptor {
    pub descriptors: Vec<Descriptor>,
}

impl EsDescriptor {
    /// Parse the body of an `esds` box (version and flags included).
    pub fn parse(data: &[u8]) -> Option<Self> {
        let body = data.get(4..)?;
        Some(Self {
            descriptors: parse_descriptors(body),
        })
    }

    fn find(&self, pred: impl Fn(&Descriptor) -> bool) -> Option<&Descriptor> {
        self.descriptors.iter().find_map(|d| d.find(&pred))
    }

    /// Object type indication from the DecoderConfig descriptor.
    pub fn object_type_indication(&self) -> Option<u8> {
        match self.find(|d| matches!(d, Descriptor::DecoderConfig { .. }))? {
            Descriptor::DecoderConfig {
                object_type_indication,
                ..
            } => Some(*object_type_indication),
            _ => None,
        }
    }

    /// Average bitrate declared by the DecoderConfig descriptor, in bits/s.
    pub fn avg_bitrate(&self) -> Option<u32> {
        match self.find(|d| matches!(d, Descriptor::DecoderConfig { .. }))? {
            Descriptor::DecoderConfig { avg_bitrate, .. } => Some(*avg_bitrate),
            _ => None,
        }
    }

    /// Payload of the DecoderSpecificInfo descriptor (AudioSpecificConfig
    /// for AAC).
    pub fn decoder_specific_info(&self) -> Option<&[u8]> {
        match self.find(|d| matches!(d, Descriptor::DecoderSpecificInfo(_)))? {
            Descriptor::DecoderSpecificInfo(data) => Some(data),
            _ => None,
        }
    }
}

fn parse_descriptors(mut data: &[u8]) -> Vec<Descriptor> {
    let mut descriptors = Vec::new();

    while data.len() >= 2 {
        let tag = data[0];
        let Some((size, header)) = read_descriptor_size(&data[1..]) else {
            break;
        };
        let start = 1 + header;
        let Some(body) = data.get(start..start + size) else {
            break;
        };
        if let Some(descriptor) = parse_descriptor(tag, body) {
            descriptors.push(descriptor);
        }
        data = &data[start + size..];
    }

    descriptors
}

/// Expandable size field: up to four bytes, 7 bits each, high bit continues.
fn read_descriptor_size(data: &[u8]) -> Option<(usize, usize)> {
    let mut size = 0usize;
    for (i, &byte) in data.iter().take(4).enumerate() {
        size = (size << 7) | (byte & 0x7F) as usize;
        if byte & 0x80 == 0 {
            return Some((size, i + 1));
        }
    }
    None
}

fn parse_descriptor(tag: u8, body: &[u8]) -> Option<Descriptor> {
    let descriptor = match tag {
        tag::ES => {
            if body.len() < 3 {
                return None;
            }
            let es_id = u16::from_be_bytes([body[0], body[1]]);
            let flags = body[2];
            let mut pos = 3;
            if flags & 0x80 != 0 {
                pos += 2; // dependsOn_ES_ID
            }
            if flags & 0x40 != 0 {
                pos += 1 + *body.get(pos)? as usize; // URL
            }
            if flags & 0x20 != 0 {
                pos += 2; // OCR_ES_Id
            }
            Descriptor::Es {
                es_id,
                children: parse_descriptors(body.get(pos..)?),
            }
        }
        tag::DECODER_CONFIG => {
            if body.len() < 13 {
                return None;
            }
            Descriptor::DecoderConfig {
                object_type_indication: body[0],
                stream_type: body[1] >> 2,
                max_bitrate: u32::from_be_bytes([body[5], body[6], body[7], body[8]]),
                avg_bitrate: u32::from_be_bytes([body[9], body[10], body[11], body[12]]),
                children: parse_descriptors(&body[13..]),
            }
        }
        tag::DECODER_SPECIFIC_INFO => Descriptor::DecoderSpecificInfo(body.to_vec()),
        tag::SL_CONFIG => Descriptor::SlConfig {
            predefined: body.first().copied().unwrap_or(0),
        },
        other => Descriptor::Unknown { tag: other },
    };
    Some(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp4::sps::build_sps;

    fn avcc_bytes(sps: &[u8], pps: &[u8]) -> Vec<u8> {
        let mut data = vec![1, sps[1], 0x00, sps[3], 0xFF, 0xE1];
        data.extend_from_slice(&(sps.len() as u16).to_be_bytes());
        data.extend_from_slice(sps);
        data.push(1);
        data.extend_from_slice(&(pps.len() as u16).to_be_bytes());
        data.extend_from_slice(pps);
        data
    }

    #[test]
    fn test_parse_avcc() {
        let sps = build_sps(0x1f, 1280, 720, None);
        let pps = [0x68, 0xEE, 0x3C, 0x80];
        let config = AvcConfig::parse(&avcc_bytes(&sps, &pps)).unwrap();

        assert_eq!(config.profile_indication, 100);
        assert_eq!(config.level_indication, 0x1f);
        assert_eq!(config.nal_length_size, 4);
        assert_eq!(config.sequence_parameter_sets, vec![sps.clone()]);
        assert_eq!(config.picture_parameter_sets, vec![pps.to_vec()]);
        assert_eq!(config.sps_info.unwrap().codec_size(), (1280, 720));
    }

    #[test]
    fn test_parse_avcc_truncated() {
        let sps = build_sps(0x1f, 1280, 720, None);
        let data = avcc_bytes(&sps, &[0x68, 0xEE]);
        assert!(AvcConfig::parse(&data[..data.len() - 1]).is_none());
    }

    #[test]
    fn test_parse_hvcc() {
        let mut data = vec![0u8; 23];
        data[0] = 1;
        data[1] = 0b0010_0001; // space 0, tier high, profile 1
        data[2..6].copy_from_slice(&0x6000_0000u32.to_be_bytes());
        data[6] = 0x90;
        data[12] = 120;
        data[21] = 0x0F;
        data[22] = 2;
        // VPS array with one unit
        data.extend_from_slice(&[0xA0, 0x00, 0x01, 0x00, 0x03, 0x40, 0x01, 0x0C]);
        // SEI array with an empty unit
        data.extend_from_slice(&[0x27, 0x00, 0x01, 0x00, 0x00]);

        let config = HevcConfig::parse(&data).unwrap();
        assert!(config.general_tier_flag);
        assert_eq!(config.general_profile_space, 0);
        assert_eq!(config.general_profile_idc, 1);
        assert_eq!(config.general_profile_compatibility_flags, 0x6000_0000);
        assert_eq!(config.general_constraint_indicator_flags[0], 0x90);
        assert_eq!(config.general_level_idc, 120);
        assert_eq!(config.nal_length_size, 4);
        assert_eq!(config.arrays.len(), 2);
        assert_eq!(config.arrays[0].nal_unit_type, 32);
        assert!(config.arrays[0].array_completeness);

        let units: Vec<_> = config.nal_units().collect();
        assert_eq!(units, vec![&vec![0x40, 0x01, 0x0C]]);
    }

    #[test]
    fn test_parse_esds() {
        let data = [
            0x00, 0x00, 0x00, 0x00, // version + flags
            0x03, 0x19, // ES_Descriptor, size 25
            0x00, 0x01, 0x00, // es_id 1, no flags
            0x04, 0x11, // DecoderConfig, size 17
            0x40, 0x15, 0x00, 0x00, 0x00, // AAC, audio stream, buffer size
            0x00, 0x01, 0xF4, 0x00, // max bitrate
            0x00, 0x01, 0xF4, 0x00, // avg bitrate
            0x05, 0x02, 0x12, 0x10, // DecoderSpecificInfo
            0x06, 0x01, 0x02, // SLConfig
        ];

        let esds = EsDescriptor::parse(&data).unwrap();
        assert_eq!(esds.object_type_indication(), Some(0x40));
        assert_eq!(esds.avg_bitrate(), Some(128_000));
        assert_eq!(esds.decoder_specific_info(), Some(&[0x12, 0x10][..]));
    }

    #[test]
    fn test_descriptor_size_multibyte() {
        assert_eq!(read_descriptor_size(&[0x80, 0x80, 0x80, 0x22]), Some((0x22, 4)));
        assert_eq!(read_descriptor_size(&[0x81, 0x00]), Some((128, 2)));
        assert_eq!(read_descriptor_size(&[0x80, 0x80]), None);
    }
}
