//! src/headers/decode.rs
//!
//! Deserializes the fixed 40-byte header. The CRC is checked before any field
//! is trusted, then the decoded fields are validated.

use crate::headers::types::{ContainerHeader, HeaderError, HEADER_CRC_SPAN, HEADER_LEN_V1};
use crate::utils::compute_crc32;

#[inline]
pub fn decode_header_le(buf: &[u8]) -> Result<ContainerHeader, HeaderError> {
    if buf.len() < HEADER_LEN_V1 {
        return Err(HeaderError::BufferTooShort { have: buf.len(), need: HEADER_LEN_V1 });
    }

    let mut i = 0usize;
    #[inline] fn get_u16(buf: &[u8], i: &mut usize) -> u16 {
        let v = u16::from_le_bytes([buf[*i], buf[*i + 1]]);
        *i += 2;
        v
    }
    #[inline] fn get_u32(buf: &[u8], i: &mut usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&buf[*i..*i + 4]);
        *i += 4;
        u32::from_le_bytes(b)
    }
    #[inline] fn get_u64(buf: &[u8], i: &mut usize) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&buf[*i..*i + 8]);
        *i += 8;
        u64::from_le_bytes(b)
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&buf[0..4]);
    i += 4;

    let h = ContainerHeader {
        magic,
        version: get_u16(buf, &mut i),
        flags: get_u16(buf, &mut i),
        digest_alg: get_u16(buf, &mut i),
        reserved: get_u16(buf, &mut i),
        index_len: get_u64(buf, &mut i),
        chunk_count: get_u64(buf, &mut i),
        body_len: get_u64(buf, &mut i),
        crc32: get_u32(buf, &mut i),
    };
    debug_assert_eq!(i, HEADER_LEN_V1);

    let computed = compute_crc32(&buf[..HEADER_CRC_SPAN]);
    if h.crc32 != computed {
        return Err(HeaderError::InvalidCrc32 { have: h.crc32, need: computed });
    }

    h.validate()?;
    Ok(h)
}
