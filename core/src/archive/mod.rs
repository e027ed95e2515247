//! archive/mod.rs
//! Building, writing, reading and extracting containers.

pub mod core;
pub mod ingest;
pub mod parallelism;
pub mod reader;
pub mod writer;

pub use self::core::Archive;
pub use ingest::{ingest_many, CancelToken, ChunkPipeline, FileIngest, IngestFailure, IngestJob, IngestOutcome};
pub use parallelism::ParallelismProfile;
pub use reader::{extract, ArchiveReader, ExtractReport, OpenedArchive, MAX_FOOTER_LEN, MAX_STORED_CHUNK};
pub use writer::{check_archive_path, ArchiveWriter, WriteReport, WriterOptions};
