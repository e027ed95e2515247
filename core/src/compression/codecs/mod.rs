//! compression/codecs/mod.rs
//! Per-chunk codecs sharing one frame layout:
//!
//! ```text
//! [ orig_len u32 LE ][ codec bytes ][ crc32(plaintext) u32 LE ]
//! ```
//!
//! - Every frame is independent; no state spans chunks.
//! - Empty plaintext frames carry no codec bytes.
//! - Decoders never allocate past the declared `orig_len`, which is itself
//!   bounded by `MAX_CHUNK_SIZE`.

pub mod brotli;
pub mod deflate;
pub mod lz4;
pub mod zstd;

pub use self::brotli::*;
pub use self::deflate::*;
pub use self::lz4::*;
pub use self::zstd::*;

use std::io::Read;

use crate::compression::constants::{FRAME_OVERHEAD, FRAME_PREFIX_LEN, FRAME_TRAILER_LEN};
use crate::compression::types::{CompressionCodec, CompressionError};
use crate::constants::MAX_CHUNK_SIZE;
use crate::utils::compute_crc32;

/// Append one frame around already-encoded `body`.
pub(crate) fn write_frame(plaintext: &[u8], body: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
    if plaintext.len() > MAX_CHUNK_SIZE {
        return Err(CompressionError::ChunkTooLarge { have: plaintext.len(), max: MAX_CHUNK_SIZE });
    }
    out.reserve(body.len() + FRAME_OVERHEAD);
    out.extend_from_slice(&(plaintext.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(&compute_crc32(plaintext).to_le_bytes());
    Ok(())
}

/// Parsed view of one frame.
pub(crate) struct Frame<'a> {
    pub orig_len: usize,
    pub body: &'a [u8],
    pub crc: u32,
}

pub(crate) fn read_frame(codec: CompressionCodec, input: &[u8]) -> Result<Frame<'_>, CompressionError> {
    if input.len() < FRAME_OVERHEAD {
        return Err(CompressionError::process(codec, "input too short for length+checksum"));
    }
    let (prefix, rest) = input.split_at(FRAME_PREFIX_LEN);
    let (body, trailer) = rest.split_at(rest.len() - FRAME_TRAILER_LEN);

    let orig_len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if orig_len > MAX_CHUNK_SIZE {
        return Err(CompressionError::ChunkTooLarge { have: orig_len, max: MAX_CHUNK_SIZE });
    }
    if orig_len == 0 && !body.is_empty() {
        return Err(CompressionError::process(codec, "empty frame carries codec bytes"));
    }
    let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);

    Ok(Frame { orig_len, body, crc })
}

/// Check decoded length and checksum, then append to `out`.
pub(crate) fn finish_frame(
    codec: CompressionCodec,
    frame: &Frame<'_>,
    decoded: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), CompressionError> {
    if decoded.len() != frame.orig_len {
        return Err(CompressionError::process(
            codec,
            format!("decoded size {} != prefix {}", decoded.len(), frame.orig_len),
        ));
    }
    verify_checksum(codec, frame.crc, compute_crc32(decoded))?;
    out.extend_from_slice(decoded);
    Ok(())
}

pub(crate) fn verify_checksum(codec: CompressionCodec, expected: u32, actual: u32) -> Result<(), CompressionError> {
    if expected != actual {
        return Err(CompressionError::ChecksumMismatch {
            codec: codec.name().into(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Drain a streaming decoder, reading at most one byte past `orig_len` so an
/// oversized stream is detected without unbounded allocation.
pub(crate) fn read_bounded<R: Read>(
    codec: CompressionCodec,
    decoder: R,
    orig_len: usize,
) -> Result<Vec<u8>, CompressionError> {
    let mut decoded = Vec::with_capacity(orig_len);
    decoder
        .take(orig_len as u64 + 1)
        .read_to_end(&mut decoded)
        .map_err(|e| CompressionError::process(codec, e))?;
    Ok(decoded)
}
