//! compression/mod.rs
//! Per-chunk compression and decompression.
//!
//! - Every chunk compresses independently, so workers never share codec state.
//! - The registry resolves wire ids to implementations.
//! - The selector picks a codec per chunk from an optional predictor.

pub mod codecs;
pub mod constants;
pub mod registry;
pub mod selector;
pub mod types;

pub use constants::*;
pub use registry::*;
pub use selector::*;
pub use types::*;
