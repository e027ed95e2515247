//! crypto/aad.rs
//! Associated data for envelopes.
//!
//! AAD = `b"MNB1"` + domain tag + domain fields + envelope header bytes.
//! The domain keeps an index envelope from opening as a footer, and binds a
//! chunk envelope to its `(source_id, chunk_index)` position.

use num_enum::TryFromPrimitive;

use crate::constants::MAGIC_MNB1;

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum AadDomain {
    Index  = 0x0001,
    Footer = 0x0002,
    Chunk  = 0x0003,
}

/// Position an envelope is sealed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AadContext<'a> {
    Index,
    Footer,
    Chunk { source_id: &'a str, chunk_index: u64 },
}

impl AadContext<'_> {
    pub fn domain(&self) -> AadDomain {
        match self {
            AadContext::Index => AadDomain::Index,
            AadContext::Footer => AadDomain::Footer,
            AadContext::Chunk { .. } => AadDomain::Chunk,
        }
    }
}

/// Build the AAD for `ctx`, authenticating the exact envelope header bytes.
#[inline]
pub fn build_aad(ctx: &AadContext<'_>, envelope_header: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAGIC_MNB1.len() + 2 + 12 + envelope_header.len());
    out.extend_from_slice(&MAGIC_MNB1);
    out.extend_from_slice(&(ctx.domain() as u16).to_le_bytes());

    if let AadContext::Chunk { source_id, chunk_index } = ctx {
        // Length-prefixed so ("ab", 1) and ("a", ...) never collide.
        out.extend_from_slice(&(source_id.len() as u32).to_le_bytes());
        out.extend_from_slice(source_id.as_bytes());
        out.extend_from_slice(&chunk_index.to_le_bytes());
    }

    out.extend_from_slice(envelope_header);
    out
}
