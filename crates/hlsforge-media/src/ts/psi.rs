//! Program Specific Information sections (PAT, PMT).

/// CRC-32 polynomial used in MPEG-TS (ISO/IEC 13818-1).
const CRC32_POLY: u32 = 0x04C1_1DB7;

/// Pre-computed CRC-32 table.
static CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ CRC32_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-32/MPEG-2 over a PSI section.
pub fn crc32(data: &[u8]) -> u32 {
    data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
        (crc << 8) ^ CRC32_TABLE[((crc >> 24) ^ byte as u32) as usize]
    })
}

/// Stream type codes used in the PMT.
pub mod stream_type {
    pub const MPEG1_AUDIO: u8 = 0x03;
    pub const AAC_ADTS: u8 = 0x0F;
    pub const H264: u8 = 0x1B;
    pub const H265: u8 = 0x24;
    pub const AC3: u8 = 0x81;
    pub const EAC3: u8 = 0x87;
}

/// Table ids.
const TABLE_PAT: u8 = 0x00;
const TABLE_PMT: u8 = 0x02;

/// Wrap a table body (everything after `section_length`, without the CRC)
/// into a complete long-form section.
fn section(table_id: u8, body: &[u8]) -> Vec<u8> {
    let section_length = body.len() + 4;
    let mut out = Vec::with_capacity(3 + section_length);
    out.push(table_id);
    out.push(0xB0 | ((section_length >> 8) as u8 & 0x0F));
    out.push(section_length as u8);
    out.extend_from_slice(body);
    let crc = crc32(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// PAT announcing a single program.
pub fn pat(transport_stream_id: u16, program_number: u16, pmt_pid: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(9);
    body.extend_from_slice(&transport_stream_id.to_be_bytes());
    // version 0, current_next
    body.extend_from_slice(&[0xC1, 0x00, 0x00]);
    body.extend_from_slice(&program_number.to_be_bytes());
    body.extend_from_slice(&(0xE000 | pmt_pid).to_be_bytes());
    section(TABLE_PAT, &body)
}

/// One elementary stream of a PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmtStream {
    pub stream_type: u8,
    pub pid: u16,
}

/// PMT for `program_number` with no descriptors.
pub fn pmt(program_number: u16, pcr_pid: u16, streams: &[PmtStream]) -> Vec<u8> {
    let mut body = Vec::with_capacity(9 + streams.len() * 5);
    body.extend_from_slice(&program_number.to_be_bytes());
    body.extend_from_slice(&[0xC1, 0x00, 0x00]);
    body.extend_from_slice(&(0xE000 | pcr_pid).to_be_bytes());
    // program_info_length
    body.extend_from_slice(&[0xF0, 0x00]);
    for stream in streams {
        body.push(stream.stream_type);
        body.extend_from_slice(&(0xE000 | stream.pid).to_be_bytes());
        body.extend_from_slice(&[0xF0, 0x00]);
    }
    section(TABLE_PMT, &body)
}
