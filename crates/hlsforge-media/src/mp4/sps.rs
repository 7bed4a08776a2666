//! H.264 sequence parameter set parsing.
//!
//! Only the fields needed to derive picture dimensions are decoded: coded
//! size from the macroblock counts, the cropped size from the frame cropping
//! window, and the sample aspect ratio from the VUI.

/// Dimensions decoded from an H.264 SPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpsInfo {
    pub profile_idc: u8,
    pub level_idc: u8,
    /// Width before cropping, in luma samples.
    pub coded_width: u32,
    /// Height before cropping, in luma samples.
    pub coded_height: u32,
    /// Width after the cropping window is applied.
    pub width: u32,
    /// Height after the cropping window is applied.
    pub height: u32,
    /// Sample aspect ratio (width, height). `(0, 0)` when unspecified.
    pub sar: (u32, u32),
}

impl SpsInfo {
    /// Cropped picture size.
    pub fn codec_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Display size after applying a non-square sample aspect ratio.
    pub fn present_size(&self) -> Option<(u32, u32)> {
        let (sar_w, sar_h) = self.sar;
        if sar_w == 0 || sar_h == 0 || sar_w == sar_h {
            return None;
        }
        Some((
            (self.width as u64 * sar_w as u64 / sar_h as u64) as u32,
            self.height,
        ))
    }
}

/// Table E-1 sample aspect ratios, indexed by `aspect_ratio_idc`.
const SAR_TABLE: [(u32, u32); 17] = [
    (0, 0),
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

const EXTENDED_SAR: u32 = 255;

/// Parse an SPS NAL unit (including its one-byte NAL header).
pub fn parse_sps(nal: &[u8]) -> Option<SpsInfo> {
    if nal.len() < 4 || nal[0] & 0x1F != 7 {
        return None;
    }

    let rbsp = remove_emulation_prevention(&nal[1..]);
    let mut reader = BitReader::new(&rbsp);

    let profile_idc = reader.read_bits(8)? as u8;
    reader.read_bits(8)?; // constraint flags
    let level_idc = reader.read_bits(8)? as u8;
    reader.read_ue()?; // seq_parameter_set_id

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    if matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    ) {
        chroma_format_idc = reader.read_ue()?;
        if chroma_format_idc == 3 {
            separate_colour_plane = reader.read_bits(1)? == 1;
        }
        reader.read_ue()?; // bit_depth_luma_minus8
        reader.read_ue()?; // bit_depth_chroma_minus8
        reader.read_bits(1)?; // qpprime_y_zero_transform_bypass_flag
        if reader.read_bits(1)? == 1 {
            let lists = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..lists {
                if reader.read_bits(1)? == 1 {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    reader.read_ue()?; // log2_max_frame_num_minus4
    let pic_order_cnt_type = reader.read_ue()?;
    if pic_order_cnt_type == 0 {
        reader.read_ue()?; // log2_max_pic_order_cnt_lsb_minus4
    } else if pic_order_cnt_type == 1 {
        reader.read_bits(1)?; // delta_pic_order_always_zero_flag
        reader.read_se()?; // offset_for_non_ref_pic
        reader.read_se()?; // offset_for_top_to_bottom_field
        let cycle = reader.read_ue()?;
        for _ in 0..cycle {
            reader.read_se()?;
        }
    }

    reader.read_ue()?; // max_num_ref_frames
    reader.read_bits(1)?; // gaps_in_frame_num_value_allowed_flag
    let width_in_mbs = reader.read_ue()? + 1;
    let height_in_map_units = reader.read_ue()? + 1;
    let frame_mbs_only = reader.read_bits(1)?;
    if frame_mbs_only == 0 {
        reader.read_bits(1)?; // mb_adaptive_frame_field_flag
    }
    reader.read_bits(1)?; // direct_8x8_inference_flag

    let coded_width = width_in_mbs * 16;
    let coded_height = (2 - frame_mbs_only) * height_in_map_units * 16;

    let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0, 0, 0, 0);
    if reader.read_bits(1)? == 1 {
        crop_left = reader.read_ue()?;
        crop_right = reader.read_ue()?;
        crop_top = reader.read_ue()?;
        crop_bottom = reader.read_ue()?;
    }

    let chroma_array_type = if separate_colour_plane {
        0
    } else {
        chroma_format_idc
    };
    let (crop_unit_x, crop_unit_y) = match chroma_array_type {
        0 => (1, 2 - frame_mbs_only),
        1 => (2, 2 * (2 - frame_mbs_only)),
        2 => (2, 2 - frame_mbs_only),
        _ => (1, 2 - frame_mbs_only),
    };

    let width = coded_width.saturating_sub((crop_left + crop_right) * crop_unit_x);
    let height = coded_height.saturating_sub((crop_top + crop_bottom) * crop_unit_y);

    let mut sar = (0, 0);
    // A truncated VUI still yields usable dimensions.
    if reader.read_bits(1) == Some(1) && reader.read_bits(1) == Some(1) {
        if let Some(idc) = reader.read_bits(8) {
            if idc == EXTENDED_SAR {
                if let (Some(w), Some(h)) = (reader.read_bits(16), reader.read_bits(16)) {
                    sar = (w, h);
                }
            } else if let Some(&entry) = SAR_TABLE.get(idc as usize) {
                sar = entry;
            }
        }
    }

    Some(SpsInfo {
        profile_idc,
        level_idc,
        coded_width,
        coded_height,
        width,
        height,
        sar,
    })
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Option<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for _ in 0..size {
        if next_scale != 0 {
            let delta = reader.read_se()?;
            next_scale = (last_scale + delta + 256) % 256;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Some(())
}

/// Strip `00 00 03` emulation prevention bytes from a NAL payload.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 3 {
            result.push(0);
            result.push(0);
            i += 3;
        } else {
            result.push(data[i]);
            i += 1;
        }
    }

    result
}

struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Read n bits (up to 32)
    fn read_bits(&mut self, n: u8) -> Option<u32> {
        let mut result = 0u32;

        for _ in 0..n {
            if self.byte_pos >= self.data.len() {
                return None;
            }

            let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
            result = (result << 1) | (bit as u32);

            self.bit_pos += 1;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }

        Some(result)
    }

    /// Read unsigned Exp-Golomb coded value
    fn read_ue(&mut self) -> Option<u32> {
        let mut leading_zeros = 0u8;
        while self.read_bits(1)? == 0 {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return None;
            }
        }

        if leading_zeros == 0 {
            return Some(0);
        }

        let suffix = self.read_bits(leading_zeros)?;
        Some(((1u64 << leading_zeros) - 1 + suffix as u64) as u32)
    }

    /// Read signed Exp-Golomb coded value
    fn read_se(&mut self) -> Option<i32> {
        let k = self.read_ue()? as i64;
        let value = if k % 2 == 1 { (k + 1) / 2 } else { -(k / 2) };
        Some(value as i32)
    }
}

/// Encode a minimal High profile SPS for the given picture size.
///
/// Sizes that are not a multiple of 16 are expressed through the frame
/// cropping window, so [`parse_sps`] recovers them exactly.
#[cfg(any(test, feature = "fixtures"))]
pub fn build_sps(level_idc: u8, width: u32, height: u32, sar: Option<(u16, u16)>) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.put_bits(100, 8); // profile_idc
    w.put_bits(0, 8);
    w.put_bits(level_idc as u32, 8);
    w.put_ue(0); // seq_parameter_set_id
    w.put_ue(1); // chroma_format_idc 4:2:0
    w.put_ue(0);
    w.put_ue(0);
    w.put_bits(0, 1);
    w.put_bits(0, 1); // no scaling matrix
    w.put_ue(0); // log2_max_frame_num_minus4
    w.put_ue(0); // pic_order_cnt_type
    w.put_ue(0);
    w.put_ue(1); // max_num_ref_frames
    w.put_bits(0, 1);

    let width_in_mbs = width.div_ceil(16);
    let height_in_mbs = height.div_ceil(16);
    w.put_ue(width_in_mbs - 1);
    w.put_ue(height_in_mbs - 1);
    w.put_bits(1, 1); // frame_mbs_only_flag
    w.put_bits(1, 1); // direct_8x8_inference_flag

    let crop_right = (width_in_mbs * 16 - width) / 2;
    let crop_bottom = (height_in_mbs * 16 - height) / 2;
    if crop_right > 0 || crop_bottom > 0 {
        w.put_bits(1, 1);
        w.put_ue(0);
        w.put_ue(crop_right);
        w.put_ue(0);
        w.put_ue(crop_bottom);
    } else {
        w.put_bits(0, 1);
    }

    match sar {
        Some((sar_w, sar_h)) => {
            w.put_bits(1, 1); // vui_parameters_present_flag
            w.put_bits(1, 1); // aspect_ratio_info_present_flag
            w.put_bits(EXTENDED_SAR, 8);
            w.put_bits(sar_w as u32, 16);
            w.put_bits(sar_h as u32, 16);
            // Remaining VUI flags all zero.
            w.put_bits(0, 8);
        }
        None => w.put_bits(0, 1),
    }

    w.put_bits(1, 1); // rbsp_stop_one_bit
    let rbsp = w.finish();

    let mut nal = vec![0x67];
    let mut zeros = 0;
    for byte in rbsp {
        if zeros >= 2 && byte <= 3 {
            nal.push(3);
            zeros = 0;
        }
        nal.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }
    nal
}

#[cfg(any(test, feature = "fixtures"))]
#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: u8,
}

#[cfg(any(test, feature = "fixtures"))]
impl BitWriter {
    fn put_bits(&mut self, value: u32, n: u8) {
        for i in (0..n).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.current = (self.current << 1) | bit;
            self.used += 1;
            if self.used == 8 {
                self.bytes.push(self.current);
                self.current = 0;
                self.used = 0;
            }
        }
    }

    fn put_ue(&mut self, value: u32) {
        let code = value as u64 + 1;
        let len = 64 - code.leading_zeros() as u8;
        self.put_bits(0, len - 1);
        for i in (0..len).rev() {
            self.put_bits(((code >> i) & 1) as u32, 1);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.current <<= 8 - self.used;
            self.bytes.push(self.current);
        }
        self.bytes
    }
}
