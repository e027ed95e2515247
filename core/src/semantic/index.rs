//! semantic/index.rs
//! Brute-force similarity search over per-chunk embeddings.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_SEARCH_THRESHOLD;
use crate::index::ArchiveIndex;
use crate::semantic::embedder::Embedder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    /// Raw dot product; equals cosine for L2-normalized embeddings.
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Matches must score strictly above this.
    pub threshold: f32,
    pub metric: SimilarityMetric,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SEARCH_THRESHOLD,
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    pub source_id: String,
    pub chunk_index: u64,
}

impl ChunkId {
    pub fn new(source_id: impl Into<String>, chunk_index: u64) -> Self {
        Self { source_id: source_id.into(), chunk_index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticEntry {
    pub id: ChunkId,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub source_id: String,
    pub chunk_index: u64,
    pub score: f64,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}

fn dot_product(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    Some(a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum())
}

#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    config: SearchConfig,
    entries: Vec<SemanticEntry>,
}

impl SemanticIndex {
    pub fn new(config: SearchConfig) -> Self {
        Self { config, entries: Vec::new() }
    }

    /// Rebuild from a saved archive's index, in write order.
    pub fn from_archive_index(index: &ArchiveIndex, config: SearchConfig) -> Self {
        let mut out = Self::new(config);
        for entry in &index.entries {
            out.index(ChunkId::new(entry.source_id.clone(), entry.chunk_index), entry.embedding.clone());
        }
        out
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SemanticEntry] {
        &self.entries
    }

    pub fn index(&mut self, id: ChunkId, embedding: Option<Vec<f32>>) {
        self.entries.push(SemanticEntry { id, embedding });
    }

    fn score(&self, query: &[f32], candidate: &[f32]) -> Option<f64> {
        match self.config.metric {
            SimilarityMetric::Cosine => cosine_similarity(query, candidate),
            SimilarityMetric::Dot => dot_product(query, candidate),
        }
    }

    /// Every chunk scoring strictly above `threshold`, best first. Ties keep
    /// insertion order.
    pub fn query_hits(&self, embedding: &[f32], threshold: f32) -> Vec<SearchHit> {
        let threshold = f64::from(threshold);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let candidate = entry.embedding.as_deref()?;
                let score = self.score(embedding, candidate)?;
                (score > threshold).then(|| SearchHit {
                    source_id: entry.id.source_id.clone(),
                    chunk_index: entry.id.chunk_index,
                    score,
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits
    }

    /// Matching source ids, best first, each listed once.
    pub fn query(&self, embedding: &[f32], threshold: f32) -> Vec<String> {
        let mut seen = HashSet::new();
        self.query_hits(embedding, threshold)
            .into_iter()
            .filter(|hit| seen.insert(hit.source_id.clone()))
            .map(|hit| hit.source_id)
            .collect()
    }

    /// Embed `text` and query with the configured threshold. An embedder
    /// failure yields no results.
    pub fn search(&self, text: &str, embedder: &dyn Embedder) -> Vec<String> {
        match embedder.embed_query(text) {
            Ok(embedding) => self.query(&embedding, self.config.threshold),
            Err(e) => {
                debug!(error = %e, "query embedding failed");
                Vec::new()
            }
        }
    }
}
