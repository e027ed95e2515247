//! archive/ingest.rs
//! File → chunk records, and the coordinator that fans files out to workers.
//!
//! Within a file everything is sequential: chunk `i` is read, compressed,
//! sealed and embedded before chunk `i + 1`. Across files, a bounded pool of
//! workers each own one whole file at a time and hand back the complete
//! result; the coordinator is the only writer of the merged state.

use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::bounded;
use tracing::{debug, info, warn};

use crate::archive::parallelism::ParallelismProfile;
use crate::chunker::{validate_chunk_size, Chunker};
use crate::compression::{create_compressor, CodecSelector, CompressionScheme};
use crate::crypto::{AadContext, Sealer};
use crate::index::ChunkRecord;
use crate::semantic::Embedder;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::ArchiveError;
use crate::utils::file_hint;

/// Cooperative cancellation shared between a caller and the ingest pool.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the token for the next batch.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestJob {
    pub path: PathBuf,
    pub source_id: String,
}

impl IngestJob {
    pub fn new(path: impl Into<PathBuf>, source_id: impl Into<String>) -> Self {
        Self { path: path.into(), source_id: source_id.into() }
    }
}

/// Everything produced for one file.
#[derive(Debug, Clone)]
pub struct FileIngest {
    pub source_id: String,
    /// Ascending `chunk_index`, starting at 0.
    pub records: Vec<ChunkRecord>,
    pub counters: TelemetryCounters,
    pub stage_times: StageTimes,
}

#[derive(Debug)]
pub struct IngestFailure {
    pub job: IngestJob,
    pub error: ArchiveError,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Whole files, in completion order.
    pub completed: Vec<FileIngest>,
    pub failures: Vec<IngestFailure>,
    /// Jobs never processed because of a failure or cancellation, in
    /// submission order.
    pub skipped: Vec<IngestJob>,
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Per-file chunk processing.
#[derive(Clone)]
pub struct ChunkPipeline {
    chunk_size: usize,
    selector: CodecSelector,
    scheme: CompressionScheme,
    sealer: Option<Sealer>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl ChunkPipeline {
    pub fn new(chunk_size: usize, selector: CodecSelector, scheme: CompressionScheme) -> Result<Self, ArchiveError> {
        validate_chunk_size(chunk_size)?;
        Ok(Self {
            chunk_size,
            selector,
            scheme,
            sealer: None,
            embedder: None,
        })
    }

    pub fn with_sealer(mut self, sealer: Option<Sealer>) -> Self {
        self.sealer = sealer;
        self
    }

    pub fn with_embedder(mut self, embedder: Option<Arc<dyn Embedder>>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn process_file(&self, job: &IngestJob) -> Result<FileIngest, ArchiveError> {
        let hint = file_hint(&job.path);
        let chunker = Chunker::open(&job.path, self.chunk_size)?;
        self.process_chunks(&job.source_id, hint.as_deref(), chunker)
    }

    pub fn process_reader<R: Read>(
        &self,
        source_id: &str,
        file_hint: Option<&str>,
        reader: R,
    ) -> Result<FileIngest, ArchiveError> {
        let chunker = Chunker::new(reader, self.chunk_size)?;
        self.process_chunks(source_id, file_hint, chunker)
    }

    fn process_chunks<R: Read>(
        &self,
        source_id: &str,
        file_hint: Option<&str>,
        mut chunker: Chunker<R>,
    ) -> Result<FileIngest, ArchiveError> {
        let mut counters = TelemetryCounters::default();
        let mut times = StageTimes::default();
        let mut records = Vec::new();

        loop {
            let t = Instant::now();
            let next = chunker.next();
            times.add(Stage::Read, t.elapsed());

            let Some(chunk) = next else { break };
            let chunk = chunk?;
            let index = records.len() as u64;
            records.push(self.process_chunk(source_id, file_hint, index, chunk, &mut counters, &mut times)?);
        }

        // An empty source is kept as one zero-length chunk so it survives
        // the round trip.
        if records.is_empty() {
            records.push(self.process_chunk(source_id, file_hint, 0, Bytes::new(), &mut counters, &mut times)?);
        }

        counters.add_file();
        debug!(source_id, chunks = records.len(), "file ingested");

        Ok(FileIngest {
            source_id: source_id.to_string(),
            records,
            counters,
            stage_times: times,
        })
    }

    fn process_chunk(
        &self,
        source_id: &str,
        file_hint: Option<&str>,
        chunk_index: u64,
        chunk: Bytes,
        counters: &mut TelemetryCounters,
        times: &mut StageTimes,
    ) -> Result<ChunkRecord, ArchiveError> {
        let codec = times.measure(Stage::Select, || self.selector.select(file_hint, &chunk));

        let compressed = times.measure(Stage::Compress, || {
            let mut compressor = create_compressor(codec.id(), Some(self.scheme.level_for(codec)))?;
            let mut out = Vec::new();
            compressor.compress_chunk(&chunk, &mut out)?;
            Ok::<_, ArchiveError>(out)
        })?;
        let compressed_len = compressed.len();

        let payload = match &self.sealer {
            Some(sealer) => times.measure(Stage::Encrypt, || {
                sealer.seal(&compressed, &AadContext::Chunk { source_id, chunk_index })
            })?,
            None => compressed,
        };

        let embedding = match &self.embedder {
            Some(embedder) if !chunk.is_empty() => {
                match times.measure(Stage::Embed, || embedder.embed(&chunk)) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        warn!(source_id, chunk_index, error = %e, "embedding failed, chunk indexed without one");
                        counters.add_embedding_failure();
                        None
                    }
                }
            }
            _ => None,
        };

        counters.add_chunk(codec, chunk.len(), compressed_len, payload.len());
        debug!(source_id, chunk_index, codec = codec.name(), plain = chunk.len(), stored = payload.len(), "chunk processed");

        Ok(ChunkRecord {
            source_id: source_id.to_string(),
            chunk_index,
            original_length: chunk.len() as u64,
            compressed_length: payload.len() as u64,
            codec,
            payload: Bytes::from(payload),
            embedding,
        })
    }
}

/// Process `jobs` on a bounded worker pool.
///
/// - Results are merged in completion order, one whole file at a time.
/// - After the first failure, or once `cancel` fires, no new file is started;
///   files already finished are returned intact and the rest are listed in
///   `skipped`.
pub fn ingest_many(
    pipeline: &ChunkPipeline,
    jobs: Vec<IngestJob>,
    profile: &ParallelismProfile,
    cancel: &CancelToken,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    if jobs.is_empty() {
        return outcome;
    }

    let workers = profile.worker_count.clamp(1, jobs.len());
    let depth = profile.inflight_files.max(1);
    info!(files = jobs.len(), workers, "ingest started");

    let failed = AtomicBool::new(false);
    let stop = || cancel.is_cancelled() || failed.load(Ordering::SeqCst);

    let (job_tx, job_rx) = bounded::<(usize, IngestJob)>(depth);
    let (out_tx, out_rx) = bounded::<(usize, IngestJob, Result<FileIngest, ArchiveError>)>(depth);
    let mut processed = vec![false; jobs.len()];

    thread::scope(|scope| {
        // ---- Feeder ----
        let all = &jobs;
        scope.spawn(move || {
            for (slot, job) in all.iter().enumerate() {
                if stop() || job_tx.send((slot, job.clone())).is_err() {
                    break;
                }
            }
        });

        // ---- Workers ----
        for i in 0..workers {
            let rx = job_rx.clone();
            let tx = out_tx.clone();
            scope.spawn(move || {
                for (slot, job) in rx.iter() {
                    if stop() {
                        break;
                    }
                    let result = pipeline.process_file(&job);
                    if tx.send((slot, job, result)).is_err() {
                        break;
                    }
                }
                debug!(worker = i, "ingest worker finished");
            });
        }
        drop(job_rx);
        drop(out_tx);

        // ---- Coordinator ----
        for (slot, job, result) in out_rx.iter() {
            processed[slot] = true;
            match result {
                Ok(file) => outcome.completed.push(file),
                Err(error) => {
                    warn!(source_id = %job.source_id, error = %error, "ingest failed, no new files will start");
                    failed.store(true, Ordering::SeqCst);
                    outcome.failures.push(IngestFailure { job, error });
                }
            }
        }
    });

    outcome.skipped = jobs
        .into_iter()
        .zip(processed)
        .filter_map(|(job, done)| (!done).then_some(job))
        .collect();

    info!(
        completed = outcome.completed.len(),
        failed = outcome.failures.len(),
        skipped = outcome.skipped.len(),
        cancelled = cancel.is_cancelled(),
        "ingest finished"
    );
    outcome
}
