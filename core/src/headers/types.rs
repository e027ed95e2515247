//! headers/types.rs
//! Fixed 40-byte container header.
//!
//! - All multi-byte integers are little endian.
//! - Reserved bytes allow future fields without changing size; always zero them.
//! - The trailing CRC32 covers bytes `0..36`.

use std::fmt;

use bitflags::bitflags;

use crate::constants::{CONTAINER_V1, MAGIC_MNB1};
use crate::crypto::digest::DigestAlg;
use crate::utils::{enum_name_or_hex, fmt_bytes};

/// Fixed header size in bytes.
pub const HEADER_LEN_V1: usize = 40;

/// Bytes covered by the header CRC.
pub const HEADER_CRC_SPAN: usize = 36;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContainerFlags: u16 {
        /// Index block, chunk blocks and footer are envelopes.
        const ENCRYPTED = 0b0000_0001;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: [u8; 4],  // "MNB1"
    pub version: u16,
    pub flags: u16,      // ContainerFlags bits
    pub digest_alg: u16, // DigestAlg id of the footer
    pub reserved: u16,   // must be zero
    pub index_len: u64,  // bytes of the index block
    pub chunk_count: u64,
    pub body_len: u64,   // sum of chunk block lengths
    pub crc32: u32,      // filled on encode, checked on decode
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self {
            magic: MAGIC_MNB1,
            version: CONTAINER_V1,
            flags: 0,
            digest_alg: DigestAlg::default() as u16,
            reserved: 0,
            index_len: 0,
            chunk_count: 0,
            body_len: 0,
            crc32: 0,
        }
    }
}

impl ContainerHeader {
    pub const LEN: usize = HEADER_LEN_V1;

    pub fn new(digest_alg: DigestAlg, encrypted: bool) -> Self {
        let mut flags = ContainerFlags::empty();
        flags.set(ContainerFlags::ENCRYPTED, encrypted);
        Self {
            flags: flags.bits(),
            digest_alg: digest_alg as u16,
            ..Default::default()
        }
    }

    pub fn flags(&self) -> ContainerFlags {
        ContainerFlags::from_bits_truncate(self.flags)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags().contains(ContainerFlags::ENCRYPTED)
    }

    pub fn digest_alg(&self) -> Result<DigestAlg, HeaderError> {
        DigestAlg::from_id(self.digest_alg).map_err(|_| HeaderError::UnknownDigest { raw: self.digest_alg })
    }

    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.magic != MAGIC_MNB1 {
            return Err(HeaderError::InvalidMagic { have: self.magic, need: MAGIC_MNB1 });
        }
        if self.version != CONTAINER_V1 {
            return Err(HeaderError::InvalidVersion { have: self.version });
        }
        if ContainerFlags::from_bits(self.flags).is_none() {
            return Err(HeaderError::UnknownFlags { raw: self.flags });
        }
        self.digest_alg()?;
        if self.reserved != 0 {
            return Err(HeaderError::ReservedNonZero { raw: self.reserved });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum HeaderError {
    /// Buffer too short to contain a header.
    BufferTooShort { have: usize, need: usize },

    /// Invalid magic marker (expected "MNB1").
    InvalidMagic { have: [u8; 4], need: [u8; 4] },

    /// Unsupported container version.
    InvalidVersion { have: u16 },

    /// Flags outside the known set.
    UnknownFlags { raw: u16 },

    /// Unknown or unsupported digest algorithm.
    UnknownDigest { raw: u16 },

    /// Reserved field must be zero.
    ReservedNonZero { raw: u16 },

    /// CRC32 over the header does not match.
    InvalidCrc32 { have: u32, need: u32 },
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HeaderError::*;
        match self {
            BufferTooShort { have, need } =>
                write!(f, "header buffer too short: {} < {}", have, need),
            InvalidMagic { have, need } =>
                write!(f, "invalid magic: expected {}, got {}", fmt_bytes(need), fmt_bytes(have)),
            InvalidVersion { have } =>
                write!(f, "unsupported container version: {}", have),
            UnknownFlags { raw } =>
                write!(f, "unknown header flags: 0x{:04x}", raw),
            UnknownDigest { raw } =>
                write!(f, "unknown digest algorithm: {}", enum_name_or_hex::<DigestAlg>(*raw)),
            ReservedNonZero { raw } =>
                write!(f, "reserved field must be zero, got 0x{:04x}", raw),
            InvalidCrc32 { have, need } =>
                write!(f, "header CRC32 mismatch: stored={:08x}, computed={:08x}", have, need),
        }
    }
}

impl std::error::Error for HeaderError {}
