//! compression/selector.rs
//! Per-chunk codec choice.
//!
//! The selector asks an optional `Predictor` for a codec id and falls back to
//! a fixed codec whenever the predictor is absent, fails, or answers with an
//! id outside the registry. Selection never fails.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::compression::constants::{HIGH_ENTROPY_BITS, PRECOMPRESSED_HINTS};
use crate::compression::types::{CompressionCodec, CompressionScheme};
use crate::entropy::entropy;

/// Features handed to a predictor for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFeatures {
    pub chunk_len: usize,
    /// Shannon entropy in bits per byte.
    pub entropy: f64,
    /// Lowercased file extension of the source, if any.
    pub file_hint: Option<String>,
}

impl ChunkFeatures {
    pub fn from_chunk(file_hint: Option<&str>, chunk: &[u8]) -> Self {
        Self {
            chunk_len: chunk.len(),
            entropy: entropy(chunk),
            file_hint: file_hint.map(str::to_owned),
        }
    }
}

#[derive(Debug)]
pub enum PredictorError {
    /// The model is not loaded or cannot be reached.
    Unavailable(String),
    /// The model ran but produced no usable answer.
    Failed(String),
}

impl fmt::Display for PredictorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictorError::Unavailable(msg) => write!(f, "predictor unavailable: {}", msg),
            PredictorError::Failed(msg) => write!(f, "predictor failed: {}", msg),
        }
    }
}

impl std::error::Error for PredictorError {}

/// Learned or rule-based codec predictor. Returns a raw codec id; the
/// selector validates it.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &ChunkFeatures) -> Result<u16, PredictorError>;
}

/// Always answers the same id. Used as a deterministic stand-in for a model.
#[derive(Debug, Clone, Copy)]
pub struct FixedPredictor(pub u16);

impl Predictor for FixedPredictor {
    fn predict(&self, _features: &ChunkFeatures) -> Result<u16, PredictorError> {
        Ok(self.0)
    }
}

/// Rule-based predictor: incompressible-looking chunks go to the fastest
/// codec, everything else to the scheme's preferred codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPredictor {
    pub scheme: CompressionScheme,
}

impl HeuristicPredictor {
    pub fn new(scheme: CompressionScheme) -> Self {
        Self { scheme }
    }
}

impl Predictor for HeuristicPredictor {
    fn predict(&self, features: &ChunkFeatures) -> Result<u16, PredictorError> {
        let precompressed = features
            .file_hint
            .as_deref()
            .map(|hint| PRECOMPRESSED_HINTS.contains(&hint))
            .unwrap_or(false);

        let codec = if precompressed || features.entropy >= HIGH_ENTROPY_BITS {
            CompressionCodec::Lz4
        } else {
            self.scheme.preferred_codec()
        };
        Ok(codec.id())
    }
}

#[derive(Clone)]
pub struct CodecSelector {
    predictor: Option<Arc<dyn Predictor>>,
    fallback: CompressionCodec,
}

impl fmt::Debug for CodecSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSelector")
            .field("predictor", &self.predictor.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl CodecSelector {
    pub fn new(predictor: Option<Arc<dyn Predictor>>, fallback: CompressionCodec) -> Self {
        Self { predictor, fallback }
    }

    pub fn fallback(&self) -> CompressionCodec {
        self.fallback
    }

    pub fn select(&self, file_hint: Option<&str>, chunk: &[u8]) -> CompressionCodec {
        let Some(predictor) = self.predictor.as_ref() else {
            return self.fallback;
        };

        let features = ChunkFeatures::from_chunk(file_hint, chunk);
        match predictor.predict(&features) {
            Ok(raw) => match CompressionCodec::try_from(raw) {
                Ok(codec) => codec,
                Err(_) => {
                    debug!(raw, fallback = ?self.fallback, "predictor returned unknown codec id");
                    self.fallback
                }
            },
            Err(e) => {
                debug!(error = %e, fallback = ?self.fallback, "predictor failed, using fallback codec");
                self.fallback
            }
        }
    }
}

impl Default for CodecSelector {
    fn default() -> Self {
        Self::new(None, CompressionCodec::default())
    }
}
