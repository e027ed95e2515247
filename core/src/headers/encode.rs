//! src/headers/encode.rs
//!
//! Serializes `ContainerHeader` into its fixed 40-byte little-endian form.
//! The CRC32 field is computed here over bytes `0..36`; the value stored in
//! the struct is ignored.

use crate::headers::types::{ContainerHeader, HeaderError, HEADER_CRC_SPAN, HEADER_LEN_V1};
use crate::utils::compute_crc32;

#[inline]
pub fn encode_header_le(h: &ContainerHeader) -> Result<[u8; HEADER_LEN_V1], HeaderError> {
    h.validate()?;

    let mut out = [0u8; HEADER_LEN_V1];
    let mut i = 0usize;

    fn put_u16(out: &mut [u8], i: &mut usize, v: u16) {
        out[*i..*i + 2].copy_from_slice(&v.to_le_bytes());
        *i += 2;
    }
    fn put_u32(out: &mut [u8], i: &mut usize, v: u32) {
        out[*i..*i + 4].copy_from_slice(&v.to_le_bytes());
        *i += 4;
    }
    fn put_u64(out: &mut [u8], i: &mut usize, v: u64) {
        out[*i..*i + 8].copy_from_slice(&v.to_le_bytes());
        *i += 8;
    }

    out[0..4].copy_from_slice(&h.magic);     // 0..4   magic
    i += 4;
    put_u16(&mut out, &mut i, h.version);    // 4..6   version
    put_u16(&mut out, &mut i, h.flags);      // 6..8   flags
    put_u16(&mut out, &mut i, h.digest_alg); // 8..10  digest algorithm
    put_u16(&mut out, &mut i, h.reserved);   // 10..12 reserved
    put_u64(&mut out, &mut i, h.index_len);  // 12..20 index block length
    put_u64(&mut out, &mut i, h.chunk_count);// 20..28 chunk count
    put_u64(&mut out, &mut i, h.body_len);   // 28..36 chunk blocks length

    debug_assert_eq!(i, HEADER_CRC_SPAN);
    let crc = compute_crc32(&out[..HEADER_CRC_SPAN]);
    put_u32(&mut out, &mut i, crc);          // 36..40 CRC32

    debug_assert_eq!(i, HEADER_LEN_V1, "encoding wrote incorrect length");
    Ok(out)
}
