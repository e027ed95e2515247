//! compression/types.rs
//! Codec identifiers, scheme tiers, error type, and the codec traits.
use std::fmt;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::compression::constants::codec_ids;
use crate::utils::enum_name_or_hex;

/// FFI-safe enum for compression codec identifiers.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, Serialize, Deserialize)]
pub enum CompressionCodec {
    Zstd    = codec_ids::ZSTD,
    Lz4     = codec_ids::LZ4,
    Deflate = codec_ids::DEFLATE,
    Brotli  = codec_ids::BROTLI,
}

impl CompressionCodec {
    pub const ALL: [CompressionCodec; 4] = [
        CompressionCodec::Zstd,
        CompressionCodec::Lz4,
        CompressionCodec::Deflate,
        CompressionCodec::Brotli,
    ];

    pub fn verify(raw: u16) -> Result<(), CompressionError> {
        Self::try_from_primitive(raw)
            .map(|_| ())
            .map_err(|_| CompressionError::UnsupportedCodec { codec_id: raw })
    }

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionCodec::Zstd => "zstd",
            CompressionCodec::Lz4 => "lz4",
            CompressionCodec::Deflate => "deflate",
            CompressionCodec::Brotli => "brotli",
        }
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        CompressionCodec::Zstd
    }
}

/// User-facing compression tier. Picks the preferred codec for compressible
/// data and the level handed to every codec.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionScheme {
    Fast,
    #[default]
    Balanced,
    Max,
}

impl CompressionScheme {
    pub fn preferred_codec(self) -> CompressionCodec {
        match self {
            CompressionScheme::Fast => CompressionCodec::Lz4,
            CompressionScheme::Balanced => CompressionCodec::Zstd,
            CompressionScheme::Max => CompressionCodec::Brotli,
        }
    }

    pub fn level_for(self, codec: CompressionCodec) -> i32 {
        use CompressionScheme::*;
        match (codec, self) {
            (CompressionCodec::Zstd, Fast) => 1,
            (CompressionCodec::Zstd, Balanced) => 9,
            (CompressionCodec::Zstd, Max) => 19,
            (CompressionCodec::Brotli, Fast) => 4,
            (CompressionCodec::Brotli, Balanced) => 6,
            (CompressionCodec::Brotli, Max) => 11,
            (CompressionCodec::Deflate, Fast) => 1,
            (CompressionCodec::Deflate, Balanced) => 6,
            (CompressionCodec::Deflate, Max) => 9,
            (CompressionCodec::Lz4, _) => 0,
        }
    }
}

impl std::str::FromStr for CompressionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(CompressionScheme::Fast),
            "balanced" => Ok(CompressionScheme::Balanced),
            "max" => Ok(CompressionScheme::Max),
            other => Err(format!("unknown compression scheme: {other}")),
        }
    }
}

#[derive(Debug)]
pub enum CompressionError {
    UnsupportedCodec { codec_id: u16 },
    CodecInitFailed { codec: String, msg: String },
    CodecProcessFailed { codec: String, msg: String },
    ChecksumMismatch { codec: String, expected: u32, actual: u32 },
    ChunkTooLarge { have: usize, max: usize },
    StateError(String),
}

impl CompressionError {
    pub(crate) fn process(codec: CompressionCodec, msg: impl ToString) -> Self {
        CompressionError::CodecProcessFailed {
            codec: codec.name().into(),
            msg: msg.to_string(),
        }
    }
}

impl From<std::io::Error> for CompressionError {
    fn from(e: std::io::Error) -> Self {
        CompressionError::StateError(e.to_string())
    }
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CompressionError::*;
        match self {
            UnsupportedCodec { codec_id } =>
                write!(f, "unsupported compression codec: {}",
                       enum_name_or_hex::<CompressionCodec>(*codec_id)),
            CodecInitFailed { codec, msg } =>
                write!(f, "codec {} init failed: {}", codec, msg),
            CodecProcessFailed { codec, msg } =>
                write!(f, "codec {} process failed: {}", codec, msg),
            ChecksumMismatch { codec, expected, actual } =>
                write!(f, "codec {} checksum mismatch: expected={:08x}, actual={:08x}",
                       codec, expected, actual),
            ChunkTooLarge { have, max } =>
                write!(f, "chunk too large: {} > {}", have, max),
            StateError(msg) =>
                write!(f, "compression state error: {}", msg),
        }
    }
}

impl std::error::Error for CompressionError {}

// Require Send so trait objects can cross thread boundaries.
pub trait Compressor: Send {
    fn codec(&self) -> CompressionCodec;
    /// Compress a single chunk into a self-contained frame appended to `out`.
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}

pub trait Decompressor: Send {
    fn codec(&self) -> CompressionCodec;
    /// Decompress one frame produced by the matching `Compressor`.
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}
