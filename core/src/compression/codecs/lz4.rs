//! codecs/lz4.rs
//! LZ4 block compressor/decompressor (lz4_flex, no levels).
use lz4_flex::block::{compress, decompress};

use crate::compression::codecs::{finish_frame, read_frame, write_frame};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Lz4;

/// LZ4 compressor using the raw block API. The frame prefix already carries
/// the original length, so the lz4_flex size prefix is not used.
pub struct Lz4Compressor;

pub struct Lz4Decompressor;

impl Lz4Compressor {
    pub fn new(_level: i32) -> Result<Box<dyn Compressor + Send>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Compressor for Lz4Compressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if input.is_empty() {
            return write_frame(input, &[], out);
        }
        let compressed = compress(input);
        write_frame(input, &compressed, out)
    }
}

impl Lz4Decompressor {
    pub fn new() -> Result<Box<dyn Decompressor + Send>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for Lz4Decompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let frame = read_frame(CODEC, input)?;
        if frame.orig_len == 0 {
            return finish_frame(CODEC, &frame, &[], out);
        }

        let decompressed = decompress(frame.body, frame.orig_len)
            .map_err(|e| CompressionError::process(CODEC, e))?;

        finish_frame(CODEC, &frame, &decompressed, out)
    }
}
