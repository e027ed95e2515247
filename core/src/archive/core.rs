//! archive/core.rs
//! Stable public API: build an archive from files, save it, search it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::ingest::{ingest_many, CancelToken, ChunkPipeline, FileIngest, IngestJob};
use crate::archive::parallelism::ParallelismProfile;
use crate::archive::writer::{check_archive_path, ArchiveWriter, WriteReport, WriterOptions};
use crate::compression::{CodecSelector, CompressionCodec, HeuristicPredictor, Predictor};
use crate::config::ArchiveConfig;
use crate::crypto::{Passphrase, Sealer};
use crate::index::ChunkRecord;
use crate::semantic::{ChunkId, Embedder, SemanticIndex};
use crate::telemetry::{TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::ArchiveError;
use crate::utils::{file_source_id, relative_source_id};

/// In-memory archive under construction.
///
/// Records accumulate in the order whole files finish ingesting; `save`
/// serializes them in that order.
pub struct Archive {
    config: ArchiveConfig,
    predictor: Option<Arc<dyn Predictor>>,
    embedder: Option<Arc<dyn Embedder>>,
    sealer: Option<Sealer>,
    cancel: CancelToken,
    records: Vec<ChunkRecord>,
    sources: HashSet<String>,
    semantic: SemanticIndex,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl Archive {
    pub fn new(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        config.validate()?;
        let predictor: Arc<dyn Predictor> = Arc::new(HeuristicPredictor::new(config.scheme));
        Ok(Self {
            semantic: SemanticIndex::new(config.search),
            config,
            predictor: Some(predictor),
            embedder: None,
            sealer: None,
            cancel: CancelToken::new(),
            records: Vec::new(),
            sources: HashSet::new(),
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        })
    }

    /// Replace the codec predictor. `None` always uses the fallback codec.
    pub fn with_predictor(mut self, predictor: Option<Arc<dyn Predictor>>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Encrypt every chunk, the index and the footer under `passphrase`.
    /// Applies to files added afterwards.
    pub fn with_passphrase(mut self, passphrase: &str) -> Result<Self, ArchiveError> {
        let passphrase = Passphrase::new(passphrase)?;
        self.sealer = Some(Sealer::new(passphrase, self.config.envelope())?);
        Ok(self)
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn is_encrypted(&self) -> bool {
        self.sealer.is_some()
    }

    /// Token that stops a running `add_files`/`add_directory` from starting
    /// new files. A cancel covers one batch: the token is re-armed when that
    /// batch returns.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn pipeline(&self) -> Result<ChunkPipeline, ArchiveError> {
        let selector = CodecSelector::new(self.predictor.clone(), CompressionCodec::Zstd);
        Ok(ChunkPipeline::new(self.config.chunk_size, selector, self.config.scheme)?
            .with_sealer(self.sealer.clone())
            .with_embedder(self.embedder.clone()))
    }

    /// Add one file under its file name.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let path = path.as_ref();
        let source_id = file_source_id(path)
            .ok_or_else(|| ArchiveError::Validation(format!("{} has no file name", path.display())))?;
        self.add_file_as(path, source_id)
    }

    /// Add one file under an explicit logical name.
    pub fn add_file_as(&mut self, path: impl AsRef<Path>, source_id: impl Into<String>) -> Result<(), ArchiveError> {
        let job = IngestJob::new(path.as_ref(), source_id);
        self.check_new_sources(std::slice::from_ref(&job))?;
        let file = self.pipeline()?.process_file(&job)?;
        self.merge(file);
        Ok(())
    }

    /// Add several files concurrently, each under its file name.
    pub fn add_files<I, P>(&mut self, paths: I) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let jobs = paths
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                file_source_id(p)
                    .map(|id| IngestJob::new(p, id))
                    .ok_or_else(|| ArchiveError::Validation(format!("{} has no file name", p.display())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.add_jobs(jobs)
    }

    /// Add every regular file below `dir`, named by its `/`-separated path
    /// relative to `dir`.
    pub fn add_directory(&mut self, dir: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let dir = dir.as_ref();
        let mut jobs = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let source_id = relative_source_id(dir, entry.path()).ok_or_else(|| {
                ArchiveError::Validation(format!("{} is not below {}", entry.path().display(), dir.display()))
            })?;
            jobs.push(IngestJob::new(entry.path(), source_id));
        }
        debug!(dir = %dir.display(), files = jobs.len(), "directory walked");
        self.add_jobs(jobs)
    }

    /// Completed files are kept even when another file fails; the first
    /// failure is returned. Files left out by a cancellation are reported as
    /// `Cancelled`.
    fn add_jobs(&mut self, jobs: Vec<IngestJob>) -> Result<(), ArchiveError> {
        self.check_new_sources(&jobs)?;
        let pipeline = self.pipeline()?;
        let profile = ParallelismProfile::for_jobs(jobs.len(), self.config.chunk_size, self.config.workers);

        let outcome = ingest_many(&pipeline, jobs, &profile, &self.cancel);
        self.cancel.reset();
        for file in outcome.completed {
            self.merge(file);
        }
        if let Some(failure) = outcome.failures.into_iter().next() {
            return Err(failure.error);
        }
        if !outcome.skipped.is_empty() {
            let skipped: Vec<String> = outcome.skipped.into_iter().map(|job| job.source_id).collect();
            warn!(count = skipped.len(), "ingest cancelled, sources not added");
            return Err(ArchiveError::Cancelled { skipped });
        }
        Ok(())
    }

    fn check_new_sources(&self, jobs: &[IngestJob]) -> Result<(), ArchiveError> {
        let mut batch = HashSet::with_capacity(jobs.len());
        for job in jobs {
            if self.sources.contains(&job.source_id) || !batch.insert(job.source_id.as_str()) {
                return Err(ArchiveError::DuplicateSource(job.source_id.clone()));
            }
        }
        Ok(())
    }

    fn merge(&mut self, file: FileIngest) {
        self.counters.merge(&file.counters);
        self.timer.stage_times.merge(&file.stage_times);
        for record in &file.records {
            self.semantic.index(
                ChunkId::new(record.source_id.clone(), record.chunk_index),
                record.embedding.clone(),
            );
        }
        self.records.extend(file.records);
        self.sources.insert(file.source_id);
    }

    /// Write the container to `path`, which must end in `.mnbl` or `.🌕`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<WriteReport, ArchiveError> {
        let path = path.as_ref();
        check_archive_path(path)?;

        let writer = ArchiveWriter::new(WriterOptions {
            digest_alg: self.config.digest_alg,
            sealer: self.sealer.clone(),
        });
        let mut report = writer.write_records(path, &self.records)?;

        let mut counters = self.counters.clone();
        counters.bytes_overhead += report.total_len - report.body_len;
        let mut timer = self.timer.clone();
        timer.stage_times.merge(&report.telemetry.stage_times);
        timer.finish();
        report.telemetry = TelemetrySnapshot::from(&counters, &timer);

        info!(path = %path.display(), files = self.sources.len(), "archive saved");
        Ok(report)
    }

    /// Write the container as `<dir>/<stem>.<ext>`, with the extension
    /// taken from the configuration.
    pub fn save_in(&self, dir: impl AsRef<Path>, stem: &str) -> Result<WriteReport, ArchiveError> {
        if stem.is_empty() {
            return Err(ArchiveError::Validation("archive name must not be empty".into()));
        }
        self.save(self.config.extension.file_name_in(dir.as_ref(), stem))
    }

    /// Sources whose chunks are similar to `query`, best first.
    pub fn search(&self, query: &str) -> Result<Vec<String>, ArchiveError> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| ArchiveError::Validation("search needs an embedder".into()))?;
        Ok(self.semantic.search(query, embedder.as_ref()))
    }

    pub fn search_embedding(&self, embedding: &[f32]) -> Vec<String> {
        self.semantic.query(embedding, self.config.search.threshold)
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn semantic_index(&self) -> &SemanticIndex {
        &self.semantic
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn contains_source(&self, source_id: &str) -> bool {
        self.sources.contains(source_id)
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }
}
