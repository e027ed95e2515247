use std::fmt;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};

use crate::constants::digest_ids;
use crate::utils::enum_name_or_hex;

/// Digest-related errors.
#[derive(Debug)]
pub enum DigestError {
    UnknownAlgorithm(u16),
    AlgorithmMismatch { expected: DigestAlg, actual: DigestAlg },
    InvalidLength { expected: usize, actual: usize },
    DigestMismatch,
    InvalidFormat,
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestError::UnknownAlgorithm(raw) =>
                write!(f, "unknown digest algorithm: {}", enum_name_or_hex::<DigestAlg>(*raw)),
            DigestError::AlgorithmMismatch { expected, actual } =>
                write!(f, "digest algorithm mismatch: header={:?}, footer={:?}", expected, actual),
            DigestError::InvalidLength { expected, actual } =>
                write!(f, "digest length mismatch: declared={}, actual={}", expected, actual),
            DigestError::DigestMismatch => write!(f, "index digest does not match footer"),
            DigestError::InvalidFormat => write!(f, "digest frame too short"),
        }
    }
}

impl std::error::Error for DigestError {}

/// Supported digest algorithms.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, TryFromPrimitive, Serialize, Deserialize)]
pub enum DigestAlg {
    #[default]
    Sha256 = digest_ids::SHA256,
    Sha512 = digest_ids::SHA512,
    Blake3 = digest_ids::BLAKE3, // unkeyed
}

impl DigestAlg {
    pub fn output_len(self) -> usize {
        match self {
            DigestAlg::Sha256 => 32,
            DigestAlg::Sha512 => 64,
            DigestAlg::Blake3 => 32,
        }
    }

    pub fn from_id(raw: u16) -> Result<Self, DigestError> {
        Self::try_from_primitive(raw).map_err(|_| DigestError::UnknownAlgorithm(raw))
    }
}

/// Incremental hashing state.
pub enum DigestState {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    pub fn new(alg: DigestAlg) -> Self {
        match alg {
            DigestAlg::Sha256 => DigestState::Sha256(Sha256::new()),
            DigestAlg::Sha512 => DigestState::Sha512(Sha512::new()),
            DigestAlg::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Sha256(h) => h.update(data),
            DigestState::Sha512(h) => h.update(data),
            DigestState::Blake3(h) => {
                h.update(data);
            }
        }
    }

    #[inline]
    pub fn finalize(self) -> Vec<u8> {
        match self {
            DigestState::Sha256(h) => h.finalize().to_vec(),
            DigestState::Sha512(h) => h.finalize().to_vec(),
            DigestState::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// One-shot digest of `data`.
pub fn compute_digest(alg: DigestAlg, data: &[u8]) -> Vec<u8> {
    let mut state = DigestState::new(alg);
    state.update(data);
    state.finalize()
}

/// Footer payload.
///
/// ```text
/// [ alg_id: u16 BE ][ digest_len: u16 BE ][ digest bytes ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestFrame {
    pub algorithm: DigestAlg,
    pub digest: Vec<u8>,
}

impl DigestFrame {
    pub fn compute(algorithm: DigestAlg, data: &[u8]) -> Self {
        Self { algorithm, digest: compute_digest(algorithm, data) }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.digest.len());
        out.extend_from_slice(&(self.algorithm as u16).to_be_bytes());
        out.extend_from_slice(&(self.digest.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.digest);
        out
    }

    pub fn decode(plaintext: &[u8]) -> Result<Self, DigestError> {
        if plaintext.len() < 4 {
            return Err(DigestError::InvalidFormat);
        }

        let alg_id = u16::from_be_bytes([plaintext[0], plaintext[1]]);
        let algorithm = DigestAlg::from_id(alg_id)?;

        let length = u16::from_be_bytes([plaintext[2], plaintext[3]]) as usize;
        let actual = plaintext.len() - 4;
        if length != actual || length != algorithm.output_len() {
            return Err(DigestError::InvalidLength { expected: length, actual });
        }

        Ok(Self { algorithm, digest: plaintext[4..].to_vec() })
    }

    /// Recompute over `data` and compare.
    pub fn verify(&self, data: &[u8]) -> Result<(), DigestError> {
        if compute_digest(self.algorithm, data) == self.digest {
            Ok(())
        } else {
            Err(DigestError::DigestMismatch)
        }
    }
}
