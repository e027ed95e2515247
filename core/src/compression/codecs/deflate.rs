//! Deflate (zlib wrapper) via flate2, one zlib stream per frame.

use std::io::Write;

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::compression::codecs::{finish_frame, read_bounded, read_frame, write_frame};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

const CODEC: CompressionCodec = CompressionCodec::Deflate;

pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    pub fn new(level: i32) -> Result<Box<dyn Compressor + Send>, CompressionError> {
        let lvl = match level {
            0..=9 => Compression::new(level as u32),
            _ => Compression::default(),
        };
        Ok(Box::new(Self { level: lvl }))
    }
}

impl Compressor for DeflateCompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if input.is_empty() {
            return write_frame(input, &[], out);
        }
        let mut enc = ZlibEncoder::new(Vec::with_capacity(input.len() / 2), self.level);
        enc.write_all(input).map_err(|e| CompressionError::process(CODEC, e))?;
        let compressed = enc.finish().map_err(|e| CompressionError::process(CODEC, e))?;

        write_frame(input, &compressed, out)
    }
}

pub struct DeflateDecompressor;

impl DeflateDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor + Send>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for DeflateDecompressor {
    fn codec(&self) -> CompressionCodec {
        CODEC
    }

    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let frame = read_frame(CODEC, input)?;
        if frame.orig_len == 0 {
            return finish_frame(CODEC, &frame, &[], out);
        }

        let decompressed = read_bounded(CODEC, ZlibDecoder::new(frame.body), frame.orig_len)?;
        finish_frame(CODEC, &frame, &decompressed, out)
    }
}
