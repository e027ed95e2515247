//! semantic/mod.rs
//! Per-chunk embeddings and approximate-meaning search.

pub mod embedder;
pub mod index;

pub use embedder::*;
pub use index::*;
