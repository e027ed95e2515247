//! telemetry/counters.rs
//! Counters collected while building or extracting an archive.
//!
//! Each worker owns its counters; the coordinator merges them once per file,
//! so no atomics or locks are involved.
use std::collections::BTreeMap;
use std::ops::AddAssign;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::compression::CompressionCodec;

#[derive(Default, Clone, Debug, Encode, Decode, PartialEq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub files: u64,
    pub chunks: u64,
    /// Chunk bytes before compression.
    pub bytes_plaintext: u64,
    /// Chunk bytes after compression, before encryption.
    pub bytes_compressed: u64,
    /// Chunk bytes as stored in the container.
    pub bytes_stored: u64,
    /// Header, index, footer and envelope bytes.
    pub bytes_overhead: u64,
    /// Chunks per codec id.
    pub codec_usage: BTreeMap<u16, u64>,
    pub embedding_failures: u64,
}

impl TelemetryCounters {
    /// Record one ingested chunk.
    pub fn add_chunk(&mut self, codec: CompressionCodec, plain_len: usize, comp_len: usize, stored_len: usize) {
        self.chunks += 1;
        self.bytes_plaintext += plain_len as u64;
        self.bytes_compressed += comp_len as u64;
        self.bytes_stored += stored_len as u64;
        *self.codec_usage.entry(codec.id()).or_insert(0) += 1;
    }

    /// Record one restored chunk.
    pub fn add_restored_chunk(&mut self, plain_len: usize, stored_len: usize) {
        self.chunks += 1;
        self.bytes_plaintext += plain_len as u64;
        self.bytes_stored += stored_len as u64;
    }

    pub fn add_file(&mut self) {
        self.files += 1;
    }

    pub fn add_overhead(&mut self, len: usize) {
        self.bytes_overhead += len as u64;
    }

    pub fn add_embedding_failure(&mut self) {
        self.embedding_failures += 1;
    }

    pub fn codec_count(&self, codec: CompressionCodec) -> u64 {
        self.codec_usage.get(&codec.id()).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.files += other.files;
        self.chunks += other.chunks;
        self.bytes_plaintext += other.bytes_plaintext;
        self.bytes_compressed += other.bytes_compressed;
        self.bytes_stored += other.bytes_stored;
        self.bytes_overhead += other.bytes_overhead;
        for (codec, n) in &other.codec_usage {
            *self.codec_usage.entry(*codec).or_insert(0) += n;
        }
        self.embedding_failures += other.embedding_failures;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
