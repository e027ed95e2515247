//! src/compression/codecs/zstd.rs
//!
//! Zstd block compressor/decompressor.
//!
//! Design notes:
//! - Uses the bulk API (`zstd::bulk`), so each frame decodes on its own.
//! - Decompression capacity is the declared original length.

use crate::compression::codecs::{finish_frame, read_frame, write_frame};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Zstd;

pub struct ZstdCompressor {
    level: i32,
}

pub struct ZstdDecompressor;

impl ZstdCompressor {
    /// # Errors
    /// - `CompressionError::CodecInitFailed` if `level` is outside zstd's range.
    pub fn new(level: i32) -> Result<Box<dyn Compressor + Send>, CompressionError> {
        let range = ::zstd::compression_level_range();
        if !range.contains(&level) {
            return Err(CompressionError::CodecInitFailed {
                codec: CODEC.name().into(),
                msg: format!("level {} outside {:?}", level, range),
            });
        }
        Ok(Box::new(Self { level }))
    }
}

impl Compressor for ZstdCompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if input.is_empty() {
            return write_frame(input, &[], out);
        }
        let compressed = ::zstd::bulk::compress(input, self.level)
            .map_err(|e| CompressionError::process(CODEC, e))?;
        write_frame(input, &compressed, out)
    }
}

impl ZstdDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor + Send>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for ZstdDecompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let frame = read_frame(CODEC, input)?;
        if frame.orig_len == 0 {
            return finish_frame(CODEC, &frame, &[], out);
        }

        // Known output size bounds the allocation.
        let decompressed = ::zstd::bulk::decompress(frame.body, frame.orig_len)
            .map_err(|e| CompressionError::process(CODEC, e))?;

        finish_frame(CODEC, &frame, &decompressed, out)
    }
}
