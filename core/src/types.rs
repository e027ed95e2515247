use std::io;

use thiserror::Error;

use crate::{
    compression::CompressionError,
    crypto::{CryptoError, DigestError},
    headers::HeaderError,
    index::IndexError,
};

/// Unified archive error covering I/O, container format, integrity, chunk
/// decoding, authentication, and generic validation.
/// - Ergonomic `From<T>` impls enable `?` across ingest, writer, and reader.
/// - Messages aim to be stable and contextual for logs and front ends.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Unreadable source or unwritable destination.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Wrong archive extension or malformed container framing.
    #[error("invalid archive format: {0}")]
    InvalidFormat(String),

    /// Footer digest does not match the index (tampering or corruption).
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// A chunk could not be authenticated or decoded.
    #[error("corrupt chunk {chunk_index} of {source_id:?}: {reason}")]
    CorruptChunk {
        source_id: String,
        chunk_index: u64,
        reason: String,
    },

    /// Wrong passphrase or tampered ciphertext.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Container is encrypted but no passphrase was supplied.
    #[error("archive is encrypted but no passphrase was supplied")]
    MissingKey,

    /// The same logical source was added twice.
    #[error("duplicate source id: {0:?}")]
    DuplicateSource(String),

    /// Compression failure while building an archive.
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Cryptographic failure while building an archive.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Ingest was cancelled before these sources were processed.
    #[error("ingest cancelled; {} source(s) not added", .skipped.len())]
    Cancelled { skipped: Vec<String> },

    /// Worker pool plumbing failure.
    #[error("pipeline error: {0}")]
    Pipeline(&'static str),

    /// Generic high-level validation with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}

impl ArchiveError {
    pub fn corrupt_chunk(source_id: &str, chunk_index: u64, reason: impl ToString) -> Self {
        ArchiveError::CorruptChunk {
            source_id: source_id.to_string(),
            chunk_index,
            reason: reason.to_string(),
        }
    }
}

impl From<HeaderError> for ArchiveError {
    fn from(e: HeaderError) -> Self {
        ArchiveError::InvalidFormat(e.to_string())
    }
}

impl From<IndexError> for ArchiveError {
    fn from(e: IndexError) -> Self {
        ArchiveError::InvalidFormat(e.to_string())
    }
}

impl From<DigestError> for ArchiveError {
    fn from(e: DigestError) -> Self {
        ArchiveError::Integrity(e.to_string())
    }
}
