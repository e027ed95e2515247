//! archive/writer.rs
//! Container serialization.
//!
//! ```text
//! [ header 40 ][ index block ][ chunk blocks ... ][ footer ]
//! ```
//!
//! The file is assembled in a temporary file next to the destination and
//! renamed into place only after a successful `sync_all`, so a failed write
//! never leaves a partial container behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::crypto::{AadContext, DigestAlg, DigestFrame, Sealer};
use crate::headers::{encode_header_le, ContainerHeader};
use crate::index::{ArchiveIndex, ChunkRecord};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::ArchiveError;
use crate::utils::{archive_extension, compute_crc32};

#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    pub digest_alg: DigestAlg,
    /// Seals the index block and the footer when present.
    pub sealer: Option<Sealer>,
}

#[derive(Debug, Clone)]
pub struct WriteReport {
    pub path: PathBuf,
    pub chunk_count: u64,
    pub index_len: u64,
    pub body_len: u64,
    pub footer_len: u64,
    pub total_len: u64,
    pub telemetry: TelemetrySnapshot,
}

/// Reject paths whose extension is not an accepted container extension.
pub fn check_archive_path(path: &Path) -> Result<(), ArchiveError> {
    if archive_extension(path).is_none() {
        return Err(ArchiveError::InvalidFormat(format!(
            "{} does not end in .mnbl or .\u{1F315}",
            path.display()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveWriter {
    options: WriterOptions,
}

impl ArchiveWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    /// Build the index from `records` and write them in order.
    pub fn write_records(&self, path: &Path, records: &[ChunkRecord]) -> Result<WriteReport, ArchiveError> {
        check_archive_path(path)?;
        let index = ArchiveIndex::from_records(records);
        let payloads: Vec<Bytes> = records.iter().map(|r| r.payload.clone()).collect();
        self.write(path, &index, &payloads)
    }

    pub fn write(&self, path: &Path, index: &ArchiveIndex, payloads: &[Bytes]) -> Result<WriteReport, ArchiveError> {
        check_archive_path(path)?;

        let mut timer = TelemetryTimer::new();
        let mut counters = TelemetryCounters::default();

        let t = Instant::now();
        validate_payloads(index, payloads)?;
        timer.add_stage_time(Stage::Validate, t.elapsed());

        let index_bytes = index.encode().map_err(|e| ArchiveError::Validation(e.to_string()))?;
        let footer_plain = DigestFrame::compute(self.options.digest_alg, &index_bytes).encode();

        let (index_block, footer) = match &self.options.sealer {
            Some(sealer) => {
                let t = Instant::now();
                // Independent envelopes: each gets its own salt, nonce and KDF pass.
                let sealed_index = sealer.seal(&index_bytes, &AadContext::Index)?;
                let sealed_footer = sealer.seal(&footer_plain, &AadContext::Footer)?;
                timer.add_stage_time(Stage::Encrypt, t.elapsed());
                (sealed_index, sealed_footer)
            }
            None => (index_bytes, footer_plain),
        };

        let body_len: u64 = payloads.iter().map(|p| p.len() as u64).sum();
        let header = ContainerHeader {
            index_len: index_block.len() as u64,
            chunk_count: index.len() as u64,
            body_len,
            ..ContainerHeader::new(self.options.digest_alg, self.options.sealer.is_some())
        };
        let header_bytes = encode_header_le(&header)?;

        let t = Instant::now();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        {
            let mut w = BufWriter::new(tmp.as_file_mut());
            w.write_all(&header_bytes)?;
            w.write_all(&index_block)?;
            for payload in payloads {
                w.write_all(payload)?;
            }
            w.write_all(&footer)?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| ArchiveError::Io(e.error))?;
        timer.add_stage_time(Stage::Write, t.elapsed());

        counters.chunks = index.len() as u64;
        counters.bytes_plaintext = index.total_original();
        counters.bytes_stored = body_len;
        counters.add_overhead(header_bytes.len() + index_block.len() + footer.len());
        timer.finish();

        let total_len = (header_bytes.len() + index_block.len() + footer.len()) as u64 + body_len;
        debug!(index_len = index_block.len(), footer_len = footer.len(), body_len, "container sections written");
        info!(path = %path.display(), chunks = index.len(), bytes = total_len, encrypted = self.options.sealer.is_some(), "archive written");

        Ok(WriteReport {
            path: path.to_path_buf(),
            chunk_count: index.len() as u64,
            index_len: index_block.len() as u64,
            body_len,
            footer_len: footer.len() as u64,
            total_len,
            telemetry: TelemetrySnapshot::from(&counters, &timer),
        })
    }
}

/// Payloads must line up one-to-one with index entries, by length and CRC.
fn validate_payloads(index: &ArchiveIndex, payloads: &[Bytes]) -> Result<(), ArchiveError> {
    if index.len() != payloads.len() {
        return Err(ArchiveError::Validation(format!(
            "index has {} entries but {} payloads were supplied",
            index.len(),
            payloads.len()
        )));
    }
    for (entry, payload) in index.entries.iter().zip(payloads) {
        if entry.compressed_length != payload.len() as u64 {
            return Err(ArchiveError::Validation(format!(
                "chunk {} of {:?}: compressed_length {} != payload {}",
                entry.chunk_index,
                entry.source_id,
                entry.compressed_length,
                payload.len()
            )));
        }
        if entry.payload_crc32 != compute_crc32(payload) {
            return Err(ArchiveError::Validation(format!(
                "chunk {} of {:?}: payload checksum does not match index",
                entry.chunk_index, entry.source_id
            )));
        }
    }
    index
        .validate_structure()
        .map_err(|e| ArchiveError::Validation(e.to_string()))
}
