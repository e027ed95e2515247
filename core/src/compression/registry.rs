//! compression/registry.rs
//! Codec registry and factory functions.

use crate::compression::codecs::{brotli, deflate, lz4, zstd};
use crate::compression::constants::{
    codec_ids, DEFAULT_LEVEL_BROTLI, DEFAULT_LEVEL_DEFLATE, DEFAULT_LEVEL_LZ4, DEFAULT_LEVEL_ZSTD,
};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

pub struct CodecInfo {
    pub name: &'static str,
    pub default_level: i32,
}

pub fn resolve(codec_id: u16) -> Result<CodecInfo, CompressionError> {
    match codec_id {
        codec_ids::ZSTD => Ok(CodecInfo { name: "zstd", default_level: DEFAULT_LEVEL_ZSTD }),
        codec_ids::LZ4 => Ok(CodecInfo { name: "lz4", default_level: DEFAULT_LEVEL_LZ4 }),
        codec_ids::DEFLATE => Ok(CodecInfo { name: "deflate", default_level: DEFAULT_LEVEL_DEFLATE }),
        codec_ids::BROTLI => Ok(CodecInfo { name: "brotli", default_level: DEFAULT_LEVEL_BROTLI }),
        other => Err(CompressionError::UnsupportedCodec { codec_id: other }),
    }
}

pub fn create_compressor(codec_id: u16, level: Option<i32>)
    -> Result<Box<dyn Compressor + Send>, CompressionError>
{
    let info = resolve(codec_id)?;
    let level = level.unwrap_or(info.default_level);
    match codec_id {
        codec_ids::ZSTD => zstd::ZstdCompressor::new(level),
        codec_ids::LZ4 => lz4::Lz4Compressor::new(level),
        codec_ids::DEFLATE => deflate::DeflateCompressor::new(level),
        codec_ids::BROTLI => brotli::BrotliCompressor::new(level),
        other => Err(CompressionError::UnsupportedCodec { codec_id: other }),
    }
}

pub fn create_decompressor(codec_id: u16)
    -> Result<Box<dyn Decompressor + Send>, CompressionError>
{
    match codec_id {
        codec_ids::ZSTD => zstd::ZstdDecompressor::new(),
        codec_ids::LZ4 => lz4::Lz4Decompressor::new(),
        codec_ids::DEFLATE => deflate::DeflateDecompressor::new(),
        codec_ids::BROTLI => brotli::BrotliDecompressor::new(),
        other => Err(CompressionError::UnsupportedCodec { codec_id: other }),
    }
}

/// One-shot compress of a single chunk into a framed buffer.
pub fn compress(codec: CompressionCodec, level: Option<i32>, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut compressor = create_compressor(codec.id(), level)?;
    let mut out = Vec::new();
    compressor.compress_chunk(input, &mut out)?;
    Ok(out)
}

/// One-shot decompress of a single framed buffer.
pub fn decompress(codec: CompressionCodec, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut decompressor = create_decompressor(codec.id())?;
    let mut out = Vec::new();
    decompressor.decompress_chunk(input, &mut out)?;
    Ok(out)
}
