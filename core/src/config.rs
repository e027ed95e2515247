//! config.rs
//! Explicit archive configuration. No globals, no environment lookups.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunker::validate_chunk_size;
use crate::compression::CompressionScheme;
use crate::constants::{DEFAULT_CHUNK_SIZE, EXT_MNBL, EXT_MOON};
use crate::crypto::{validate_iterations, CipherSuite, DigestAlg, EnvelopeConfig};
use crate::semantic::SearchConfig;
use crate::types::ArchiveError;

/// Container file extension variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveExtension {
    #[default]
    Mnbl,
    Moon,
}

impl ArchiveExtension {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveExtension::Mnbl => EXT_MNBL,
            ArchiveExtension::Moon => EXT_MOON,
        }
    }

    /// `<dir>/<stem>.<ext>`
    pub fn file_name_in(self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{}.{}", stem, self.as_str()))
    }

    /// `archive.mnbl` or `archive.🌕`
    pub fn default_file_name(self) -> String {
        format!("archive.{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub chunk_size: usize,
    pub scheme: CompressionScheme,
    pub digest_alg: DigestAlg,
    pub cipher: CipherSuite,
    pub kdf_iterations: u32,
    /// Worker override; `None` sizes the pool from the host.
    pub workers: Option<usize>,
    pub extension: ArchiveExtension,
    pub search: SearchConfig,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        let envelope = EnvelopeConfig::default();
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            scheme: CompressionScheme::default(),
            digest_alg: DigestAlg::default(),
            cipher: envelope.cipher,
            kdf_iterations: envelope.kdf_iterations,
            workers: None,
            extension: ArchiveExtension::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ArchiveConfig {
    pub fn validate(&self) -> Result<(), ArchiveError> {
        validate_chunk_size(self.chunk_size)?;
        validate_iterations(self.kdf_iterations)
            .map_err(|e| ArchiveError::Validation(e.to_string()))?;
        if self.workers == Some(0) {
            return Err(ArchiveError::Validation("workers must be at least 1".into()));
        }
        if !self.search.threshold.is_finite() {
            return Err(ArchiveError::Validation("search threshold must be finite".into()));
        }
        Ok(())
    }

    pub fn envelope(&self) -> EnvelopeConfig {
        EnvelopeConfig {
            cipher: self.cipher,
            kdf_iterations: self.kdf_iterations,
        }
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ArchiveError> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ArchiveError::Validation(format!("config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, ArchiveError> {
        serde_json::to_string_pretty(self).map_err(|e| ArchiveError::Validation(format!("config: {}", e)))
    }
}
