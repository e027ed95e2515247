//! index.rs
//! In-memory chunk records and the serialized archive index.
//!
//! The index is the only structured data in a container. It is encoded with
//! bincode (little endian, fixed-width integers) and is decoded only after
//! the footer digest over its bytes has been verified.

use std::collections::HashMap;
use std::fmt;

use bincode::config::{self, Config};
use bincode::{Decode, Encode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::compression::CompressionCodec;
use crate::constants::INDEX_FORMAT_V1;
use crate::utils::compute_crc32;

/// Upper bound on bytes the index decoder may claim.
pub const INDEX_DECODE_LIMIT: usize = 1 << 30;

fn index_config() -> impl Config {
    config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
        .with_limit::<INDEX_DECODE_LIMIT>()
}

/// One stored chunk, as produced by ingest and consumed by the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub source_id: String,
    pub chunk_index: u64,
    /// Plaintext length before compression.
    pub original_length: u64,
    /// Stored length after compression and optional encryption.
    pub compressed_length: u64,
    pub codec: CompressionCodec,
    pub payload: Bytes,
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    pub fn to_entry(&self) -> IndexEntry {
        IndexEntry {
            source_id: self.source_id.clone(),
            chunk_index: self.chunk_index,
            original_length: self.original_length,
            compressed_length: self.compressed_length,
            codec: self.codec.id(),
            payload_crc32: compute_crc32(&self.payload),
            embedding: self.embedding.clone(),
        }
    }
}

/// Payload-free metadata of a chunk as stored in the container.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct IndexEntry {
    pub source_id: String,
    pub chunk_index: u64,
    pub original_length: u64,
    pub compressed_length: u64,
    /// Raw codec id; checked against the registry at read time.
    pub codec: u16,
    /// CRC32 of the stored payload bytes.
    pub payload_crc32: u32,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub format_version: u16,
    pub created_unix_ms: i64,
    /// Insertion order is write order.
    pub entries: Vec<IndexEntry>,
}

impl Default for ArchiveIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self {
            format_version: INDEX_FORMAT_V1,
            created_unix_ms: chrono::Utc::now().timestamp_millis(),
            entries: Vec::new(),
        }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ChunkRecord>) -> Self {
        let mut index = Self::new();
        index.entries.extend(records.into_iter().map(ChunkRecord::to_entry));
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_compressed(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed_length).sum()
    }

    pub fn total_original(&self) -> u64 {
        self.entries.iter().map(|e| e.original_length).sum()
    }

    pub fn encode(&self) -> Result<Vec<u8>, IndexError> {
        bincode::encode_to_vec(self, index_config()).map_err(|e| IndexError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        let (index, read): (Self, usize) = bincode::decode_from_slice(bytes, index_config())
            .map_err(|e| IndexError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(IndexError::TrailingBytes { read, total: bytes.len() });
        }
        if index.format_version != INDEX_FORMAT_V1 {
            return Err(IndexError::UnsupportedVersion { have: index.format_version });
        }
        Ok(index)
    }

    /// Group entries by source: groups in first-appearance order, each
    /// group sorted by ascending `chunk_index`.
    pub fn groups(&self) -> Vec<(&str, Vec<&IndexEntry>)> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&IndexEntry>> = HashMap::new();
        for entry in &self.entries {
            let group = groups.entry(entry.source_id.as_str()).or_insert_with(|| {
                order.push(entry.source_id.as_str());
                Vec::new()
            });
            group.push(entry);
        }

        order
            .into_iter()
            .map(|source| {
                let mut group = groups.remove(source).unwrap_or_default();
                group.sort_by_key(|e| e.chunk_index);
                (source, group)
            })
            .collect()
    }

    /// Every source must hold chunk indices exactly `0..N` and every codec id
    /// must be known.
    pub fn validate_structure(&self) -> Result<(), IndexError> {
        for entry in &self.entries {
            if CompressionCodec::try_from(entry.codec).is_err() {
                return Err(IndexError::UnknownCodec {
                    source_id: entry.source_id.clone(),
                    chunk_index: entry.chunk_index,
                    raw: entry.codec,
                });
            }
            if entry.source_id.is_empty() {
                return Err(IndexError::EmptySourceId);
            }
        }

        for (source, group) in self.groups() {
            for (expected, entry) in group.iter().enumerate() {
                if entry.chunk_index != expected as u64 {
                    return Err(IndexError::NonContiguous {
                        source_id: source.to_string(),
                        expected: expected as u64,
                        found: entry.chunk_index,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum IndexError {
    Encode(String),
    Decode(String),
    TrailingBytes { read: usize, total: usize },
    UnsupportedVersion { have: u16 },
    UnknownCodec { source_id: String, chunk_index: u64, raw: u16 },
    EmptySourceId,
    NonContiguous { source_id: String, expected: u64, found: u64 },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use IndexError::*;
        match self {
            Encode(msg) => write!(f, "index encode failed: {}", msg),
            Decode(msg) => write!(f, "index decode failed: {}", msg),
            TrailingBytes { read, total } =>
                write!(f, "index has trailing bytes: decoded {} of {}", read, total),
            UnsupportedVersion { have } => write!(f, "unsupported index version: {}", have),
            UnknownCodec { source_id, chunk_index, raw } =>
                write!(f, "chunk {} of {:?} names unknown codec 0x{:04x}", chunk_index, source_id, raw),
            EmptySourceId => write!(f, "index entry with empty source id"),
            NonContiguous { source_id, expected, found } =>
                write!(f, "chunk indices of {:?} not contiguous: expected {}, found {}",
                       source_id, expected, found),
        }
    }
}

impl std::error::Error for IndexError {}
