//! codecs/brotli.rs
//! Brotli compressor/decompressor for the high-ratio tier.

use std::io::Write;

use crate::compression::codecs::{finish_frame, read_bounded, read_frame, write_frame};
use crate::compression::constants::{BROTLI_BUFFER, BROTLI_LGWIN};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Brotli;

pub struct BrotliCompressor {
    quality: u32,
}

pub struct BrotliDecompressor;

impl BrotliCompressor {
    /// Quality is clamped into brotli's `0..=11`.
    pub fn new(level: i32) -> Result<Box<dyn Compressor + Send>, CompressionError> {
        Ok(Box::new(Self { quality: level.clamp(0, 11) as u32 }))
    }
}

impl Compressor for BrotliCompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if input.is_empty() {
            return write_frame(input, &[], out);
        }
        let mut enc = ::brotli::CompressorWriter::new(
            Vec::with_capacity(input.len() / 2),
            BROTLI_BUFFER,
            self.quality,
            BROTLI_LGWIN,
        );
        enc.write_all(input).map_err(|e| CompressionError::process(CODEC, e))?;
        enc.flush().map_err(|e| CompressionError::process(CODEC, e))?;
        let compressed = enc.into_inner();

        write_frame(input, &compressed, out)
    }
}

impl BrotliDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor + Send>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for BrotliDecompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let frame = read_frame(CODEC, input)?;
        if frame.orig_len == 0 {
            return finish_frame(CODEC, &frame, &[], out);
        }

        let decoder = ::brotli::Decompressor::new(frame.body, BROTLI_BUFFER);
        let decompressed = read_bounded(CODEC, decoder, frame.orig_len)?;
        finish_frame(CODEC, &frame, &decompressed, out)
    }
}
