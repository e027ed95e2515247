//! archive/reader.rs
//! Opening, verifying and extracting containers.
//!
//! `open` reads only the header, the index block and the footer. Nothing in
//! the index is trusted until the footer digest over its plaintext bytes has
//! been checked; chunk blocks are read lazily during extraction.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam::channel::bounded;
use num_enum::TryFromPrimitive;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, warn};

use crate::archive::parallelism::ParallelismProfile;
use crate::archive::writer::check_archive_path;
use crate::compression::{create_decompressor, CompressionCodec, CompressionError, FRAME_OVERHEAD};
use crate::constants::MAX_CHUNK_SIZE;
use crate::crypto::{open_with, AadContext, DigestFrame, Envelope, Passphrase};
use crate::headers::{decode_header_le, ContainerHeader, HEADER_LEN_V1};
use crate::index::{ArchiveIndex, IndexEntry};
use crate::semantic::{SearchConfig, SemanticIndex};
use crate::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::ArchiveError;
use crate::utils::{compute_crc32, sanitize_source_id};

/// Largest footer a reader accepts (plain or sealed).
pub const MAX_FOOTER_LEN: u64 = 4096;

/// Largest stored chunk block a reader will allocate for.
pub const MAX_STORED_CHUNK: u64 = 2 * MAX_CHUNK_SIZE as u64 + (FRAME_OVERHEAD + Envelope::OVERHEAD) as u64;

pub struct ArchiveReader;

impl ArchiveReader {
    /// Open and verify `path`. A passphrase given for an unencrypted
    /// container is ignored.
    pub fn open(path: &Path, passphrase: Option<&Passphrase>) -> Result<OpenedArchive, ArchiveError> {
        check_archive_path(path)?;

        let mut timer = TelemetryTimer::new();
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut header_buf = [0u8; HEADER_LEN_V1];
        if file_len < HEADER_LEN_V1 as u64 {
            return Err(ArchiveError::InvalidFormat(format!(
                "file is {} bytes, shorter than the {}-byte header",
                file_len, HEADER_LEN_V1
            )));
        }
        file.read_exact(&mut header_buf)?;
        let header = decode_header_le(&header_buf)?;
        let footer_len = section_bounds(&header, file_len)?;

        let passphrase = match (header.is_encrypted(), passphrase) {
            (true, None) => return Err(ArchiveError::MissingKey),
            (true, Some(p)) => Some(p.clone()),
            (false, Some(_)) => {
                debug!(path = %path.display(), "archive is not encrypted, ignoring passphrase");
                None
            }
            (false, None) => None,
        };

        let mut index_block = vec![0u8; header.index_len as usize];
        file.read_exact(&mut index_block)?;
        file.seek(SeekFrom::Start(file_len - footer_len))?;
        let mut footer = vec![0u8; footer_len as usize];
        file.read_exact(&mut footer)?;

        let t = Instant::now();
        let (index_bytes, footer_plain) = match &passphrase {
            Some(p) => {
                let index_bytes = open_with(p, &index_block, &AadContext::Index)
                    .map_err(|e| ArchiveError::Authentication(format!("index block: {}", e)))?;
                let footer_plain = open_with(p, &footer, &AadContext::Footer)
                    .map_err(|e| ArchiveError::Integrity(format!("footer: {}", e)))?;
                (index_bytes, footer_plain)
            }
            None => (index_block, footer),
        };
        timer.add_stage_time(Stage::Decrypt, t.elapsed());

        let t = Instant::now();
        let frame = DigestFrame::decode(&footer_plain)?;
        let expected_alg = header.digest_alg()?;
        if frame.algorithm != expected_alg {
            return Err(ArchiveError::Integrity(format!(
                "footer digest is {:?}, header declares {:?}",
                frame.algorithm, expected_alg
            )));
        }
        frame.verify(&index_bytes)?;

        let index = ArchiveIndex::decode(&index_bytes)?;
        check_index_against_header(&index, &header)?;
        index.validate_structure()?;
        timer.add_stage_time(Stage::Validate, t.elapsed());

        info!(
            path = %path.display(),
            chunks = index.len(),
            encrypted = header.is_encrypted(),
            "archive opened"
        );

        Ok(OpenedArchive {
            path: path.to_path_buf(),
            header,
            index,
            passphrase,
            timer,
        })
    }
}

/// Footer length implied by the header, after checking every section fits.
fn section_bounds(header: &ContainerHeader, file_len: u64) -> Result<u64, ArchiveError> {
    let used = (HEADER_LEN_V1 as u64)
        .checked_add(header.index_len)
        .and_then(|n| n.checked_add(header.body_len))
        .ok_or_else(|| ArchiveError::InvalidFormat("section lengths overflow".into()))?;

    if used >= file_len {
        return Err(ArchiveError::InvalidFormat(format!(
            "sections need {} bytes plus a footer, file has {}",
            used, file_len
        )));
    }
    let footer_len = file_len - used;
    if footer_len > MAX_FOOTER_LEN {
        return Err(ArchiveError::InvalidFormat(format!(
            "footer of {} bytes exceeds {}",
            footer_len, MAX_FOOTER_LEN
        )));
    }
    Ok(footer_len)
}

fn check_index_against_header(index: &ArchiveIndex, header: &ContainerHeader) -> Result<(), ArchiveError> {
    if index.len() as u64 != header.chunk_count {
        return Err(ArchiveError::Integrity(format!(
            "index has {} entries, header declares {}",
            index.len(),
            header.chunk_count
        )));
    }
    let body: u64 = index
        .entries
        .iter()
        .try_fold(0u64, |acc, e| acc.checked_add(e.compressed_length))
        .ok_or_else(|| ArchiveError::Integrity("chunk lengths overflow".into()))?;
    if body != header.body_len {
        return Err(ArchiveError::Integrity(format!(
            "index covers {} chunk bytes, header declares {}",
            body, header.body_len
        )));
    }
    Ok(())
}

/// A verified container, ready to extract or search.
#[derive(Debug)]
pub struct OpenedArchive {
    path: PathBuf,
    header: ContainerHeader,
    index: ArchiveIndex,
    passphrase: Option<Passphrase>,
    timer: TelemetryTimer,
}

#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub output_dir: PathBuf,
    /// Written files, in index group order.
    pub files: Vec<PathBuf>,
    pub telemetry: TelemetrySnapshot,
}

/// One output file: every chunk of one source, with absolute offsets.
struct GroupPlan<'a> {
    source_id: &'a str,
    destination: PathBuf,
    chunks: Vec<(&'a IndexEntry, u64)>,
}

struct GroupDone {
    slot: usize,
    temp: TempPath,
    counters: TelemetryCounters,
    times: StageTimes,
}

impl OpenedArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn is_encrypted(&self) -> bool {
        self.header.is_encrypted()
    }

    /// Rebuild the search index from the stored embeddings.
    pub fn semantic_index(&self, config: SearchConfig) -> SemanticIndex {
        SemanticIndex::from_archive_index(&self.index, config)
    }

    /// Restore every source under `output_dir`.
    ///
    /// Sources are restored in parallel, each by a single worker in
    /// ascending `chunk_index`. Output appears only if every source
    /// succeeded; on failure no output file is left behind.
    pub fn extract(&self, output_dir: &Path, workers: Option<usize>) -> Result<ExtractReport, ArchiveError> {
        let mut timer = TelemetryTimer::new();
        timer.stage_times.merge(&self.timer.stage_times);

        let plans = self.plan(output_dir)?;
        fs::create_dir_all(output_dir)?;
        for plan in &plans {
            if let Some(parent) = plan.destination.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let chunk_size = self
            .index
            .entries
            .iter()
            .map(|e| e.original_length as usize)
            .max()
            .unwrap_or(1);
        let profile = ParallelismProfile::for_jobs(plans.len(), chunk_size, workers);
        let worker_count = profile.worker_count.clamp(1, plans.len().max(1));
        info!(
            path = %self.path.display(),
            files = plans.len(),
            workers = worker_count,
            "extraction started"
        );

        let abort = AtomicBool::new(false);
        let mut first_error: Option<ArchiveError> = None;
        let mut done: Vec<Option<GroupDone>> = (0..plans.len()).map(|_| None).collect();

        let (job_tx, job_rx) = bounded::<usize>(plans.len().max(1));
        let (out_tx, out_rx) = bounded::<Result<GroupDone, ArchiveError>>(worker_count);
        for slot in 0..plans.len() {
            // Capacity equals the job count, so this never blocks.
            if job_tx.send(slot).is_err() {
                return Err(ArchiveError::Pipeline("extract job channel closed"));
            }
        }
        drop(job_tx);

        thread::scope(|scope| {
            for i in 0..worker_count {
                let rx = job_rx.clone();
                let tx = out_tx.clone();
                let plans = &plans;
                let abort = &abort;
                scope.spawn(move || {
                    let mut body = match File::open(&self.path) {
                        Ok(f) => f,
                        Err(e) => {
                            let _ = tx.send(Err(e.into()));
                            return;
                        }
                    };
                    for slot in rx.iter() {
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let result = self.restore_group(&mut body, slot, &plans[slot], abort);
                        if tx.send(result).is_err() {
                            break;
                        }
                    }
                    debug!(worker = i, "extract worker finished");
                });
            }
            drop(job_rx);
            drop(out_tx);

            for result in out_rx.iter() {
                match result {
                    Ok(group) => {
                        let slot = group.slot;
                        done[slot] = Some(group);
                    }
                    Err(e) => {
                        abort.store(true, Ordering::SeqCst);
                        if first_error.is_none() {
                            warn!(error = %e, "extraction failed, discarding output");
                            first_error = Some(e);
                        }
                    }
                }
            }
        });

        if let Some(e) = first_error {
            // Dropping `done` removes every temp file.
            return Err(e);
        }

        let mut counters = TelemetryCounters::default();
        let mut staged = Vec::with_capacity(plans.len());
        for (plan, group) in plans.iter().zip(done) {
            let group = group.ok_or(ArchiveError::Pipeline("extract worker exited early"))?;
            counters.merge(&group.counters);
            timer.stage_times.merge(&group.times);
            staged.push((plan.destination.clone(), group.temp));
        }

        let t = Instant::now();
        let files = publish(staged)?;
        timer.add_stage_time(Stage::Write, t.elapsed());
        timer.finish();

        info!(
            output_dir = %output_dir.display(),
            files = files.len(),
            bytes = counters.bytes_plaintext,
            "extraction finished"
        );

        Ok(ExtractReport {
            output_dir: output_dir.to_path_buf(),
            files,
            telemetry: TelemetrySnapshot::from(&counters, &timer),
        })
    }

    /// Groups with their destinations and chunk offsets.
    fn plan(&self, output_dir: &Path) -> Result<Vec<GroupPlan<'_>>, ArchiveError> {
        let mut offsets: HashMap<(&str, u64), u64> = HashMap::with_capacity(self.index.len());
        let mut cursor = (HEADER_LEN_V1 as u64) + self.header.index_len;
        for entry in &self.index.entries {
            offsets.insert((entry.source_id.as_str(), entry.chunk_index), cursor);
            cursor += entry.compressed_length;
        }

        let mut seen = HashSet::new();
        let mut plans = Vec::new();
        for (source_id, entries) in self.index.groups() {
            let relative = sanitize_source_id(source_id).ok_or_else(|| {
                ArchiveError::InvalidFormat(format!("source id {:?} has no usable path", source_id))
            })?;
            let destination = output_dir.join(relative);
            if !seen.insert(destination.clone()) {
                return Err(ArchiveError::InvalidFormat(format!(
                    "source id {:?} collides with another source after sanitizing",
                    source_id
                )));
            }

            let mut chunks = Vec::with_capacity(entries.len());
            for entry in entries {
                let offset = offsets
                    .get(&(source_id, entry.chunk_index))
                    .copied()
                    .ok_or_else(|| ArchiveError::corrupt_chunk(source_id, entry.chunk_index, "no offset"))?;
                chunks.push((entry, offset));
            }
            plans.push(GroupPlan { source_id, destination, chunks });
        }
        Ok(plans)
    }

    fn restore_group(
        &self,
        body: &mut File,
        slot: usize,
        plan: &GroupPlan<'_>,
        abort: &AtomicBool,
    ) -> Result<GroupDone, ArchiveError> {
        let dir = plan.destination.parent().unwrap_or(Path::new("."));
        let mut out = BufWriter::new(NamedTempFile::new_in(dir)?);
        let mut counters = TelemetryCounters::default();
        let mut times = StageTimes::default();

        for (entry, offset) in &plan.chunks {
            if abort.load(Ordering::SeqCst) {
                return Err(ArchiveError::Pipeline("extraction aborted"));
            }
            let plain = self.restore_chunk(body, entry, *offset, &mut times)?;
            times.measure(Stage::Write, || out.write_all(&plain))?;
            counters.add_restored_chunk(plain.len(), entry.compressed_length as usize);
        }

        let file = out.into_inner().map_err(|e| ArchiveError::Io(e.into_error()))?;
        file.as_file().sync_all()?;
        counters.add_file();
        debug!(source_id = plan.source_id, chunks = plan.chunks.len(), "source restored");

        // Closing the handle here keeps open descriptors bounded by the
        // worker count rather than the file count.
        Ok(GroupDone {
            slot,
            temp: file.into_temp_path(),
            counters,
            times,
        })
    }

    fn restore_chunk(
        &self,
        body: &mut File,
        entry: &IndexEntry,
        offset: u64,
        times: &mut StageTimes,
    ) -> Result<Vec<u8>, ArchiveError> {
        let source_id = entry.source_id.as_str();
        let chunk_index = entry.chunk_index;
        let corrupt = |reason: String| ArchiveError::corrupt_chunk(source_id, chunk_index, reason);

        if entry.compressed_length > MAX_STORED_CHUNK {
            return Err(corrupt(format!("stored length {} is too large", entry.compressed_length)));
        }
        if entry.original_length > MAX_CHUNK_SIZE as u64 {
            return Err(corrupt(format!("original length {} is too large", entry.original_length)));
        }

        let t = Instant::now();
        let mut stored = vec![0u8; entry.compressed_length as usize];
        body.seek(SeekFrom::Start(offset))?;
        body.read_exact(&mut stored)?;
        times.add(Stage::Read, t.elapsed());

        let actual = compute_crc32(&stored);
        if actual != entry.payload_crc32 {
            return Err(corrupt(format!(
                "payload checksum {:08x}, index records {:08x}",
                actual, entry.payload_crc32
            )));
        }

        let compressed = match &self.passphrase {
            Some(p) => times
                .measure(Stage::Decrypt, || {
                    open_with(p, &stored, &AadContext::Chunk { source_id, chunk_index })
                })
                .map_err(|e| corrupt(e.to_string()))?,
            None => stored,
        };

        let codec = CompressionCodec::try_from_primitive(entry.codec)
            .map_err(|_| corrupt(format!("unknown codec 0x{:04x}", entry.codec)))?;
        let plain = times
            .measure(Stage::Decompress, || {
                let mut decompressor = create_decompressor(codec.id())?;
                let mut out = Vec::with_capacity(entry.original_length as usize);
                decompressor.decompress_chunk(&compressed, &mut out)?;
                Ok::<_, CompressionError>(out)
            })
            .map_err(|e| corrupt(e.to_string()))?;

        if plain.len() as u64 != entry.original_length {
            return Err(corrupt(format!(
                "restored {} bytes, index records {}",
                plain.len(),
                entry.original_length
            )));
        }
        Ok(plain)
    }
}

/// Move every staged temp file onto its destination. If one rename fails,
/// files already moved are removed again.
fn publish(staged: Vec<(PathBuf, TempPath)>) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut published: Vec<PathBuf> = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();

    while let Some((destination, temp)) = pending.next() {
        if let Err(e) = temp.persist(&destination) {
            for path in &published {
                let _ = fs::remove_file(path);
            }
            // Remaining temp paths are dropped, and deleted, with `pending`.
            return Err(ArchiveError::Io(e.error));
        }
        published.push(destination);
    }
    Ok(published)
}

/// Open `path` and restore everything under `output_dir`.
///
/// An empty passphrase counts as none: a plain container still extracts,
/// an encrypted one fails with `MissingKey`.
pub fn extract(path: &Path, output_dir: &Path, passphrase: Option<&str>) -> Result<ExtractReport, ArchiveError> {
    let passphrase = passphrase
        .filter(|p| !p.is_empty())
        .map(Passphrase::new)
        .transpose()?;
    ArchiveReader::open(path, passphrase.as_ref())?.extract(output_dir, None)
}
