//! headers/mod.rs
//! Container header: fixed size, little endian, CRC-protected.

pub mod decode;
pub mod encode;
pub mod types;

pub use decode::*;
pub use encode::*;
pub use types::*;
