//! moonball-core
//!
//! Chunked, compressed, optionally encrypted archive engine with a
//! per-chunk semantic index.
//! Pure Rust. No FFI, no globals, no logging subscriber.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;

// Building blocks
pub mod entropy;
pub mod chunker;
pub mod compression;
pub mod crypto;
pub mod headers;
pub mod index;
pub mod semantic;
pub mod telemetry;

// Container operations
pub mod archive;

pub use archive::{extract, Archive, ArchiveReader, ArchiveWriter, ExtractReport, OpenedArchive, WriteReport};
pub use config::{ArchiveConfig, ArchiveExtension};
pub use types::ArchiveError;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::archive::{
        extract, Archive, ArchiveReader, ArchiveWriter, CancelToken, ExtractReport, OpenedArchive, WriteReport,
        WriterOptions,
    };
    pub use crate::compression::{CompressionCodec, CompressionScheme, FixedPredictor, HeuristicPredictor, Predictor};
    pub use crate::config::{ArchiveConfig, ArchiveExtension};
    pub use crate::crypto::{CipherSuite, DigestAlg, Passphrase};
    pub use crate::index::{ArchiveIndex, ChunkRecord, IndexEntry};
    pub use crate::semantic::{Embedder, HashingEmbedder, ProcessEmbedder, SearchConfig, SemanticIndex};
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::ArchiveError;
}
