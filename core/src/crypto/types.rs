use std::fmt;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::constants::cipher_ids;
use crate::utils::enum_name_or_hex;

/// Stable key and nonce sizes.
pub const KEY_LEN_32: usize = 32;

/// Standard 12-byte nonce length for AES-GCM and ChaCha20-Poly1305.
pub const NONCE_LEN_12: usize = 12;

/// Fixed AEAD tag length (bytes).
pub const TAG_LEN: usize = 16;

/// Authenticated cipher suites selectable for envelopes.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, TryFromPrimitive, Serialize, Deserialize)]
pub enum CipherSuite {
    #[default]
    Aes256Gcm        = cipher_ids::AES256_GCM,
    Chacha20Poly1305 = cipher_ids::CHACHA20_POLY1305,
}

impl CipherSuite {
    pub fn verify(raw: u16) -> Result<(), CryptoError> {
        Self::try_from_primitive(raw)
            .map(|_| ())
            .map_err(|_| CryptoError::UnsupportedCipher { cipher_id: raw })
    }
}

#[derive(Debug)]
pub enum NonceError {
    /// Salt is invalid (e.g., all zeros).
    InvalidSalt,

    /// Requested nonce length is unsupported.
    InvalidNonceLen { requested: usize, supported: usize },
}

impl fmt::Display for NonceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonceError::InvalidSalt => write!(f, "invalid salt: all zeros"),
            NonceError::InvalidNonceLen { requested, supported } =>
                write!(f, "invalid nonce length: requested={}, supported={}", requested, supported),
        }
    }
}

impl std::error::Error for NonceError {}

#[derive(Debug)]
pub enum CryptoError {
    /// Unsupported cipher suite ID in an envelope.
    UnsupportedCipher { cipher_id: u16 },

    /// Invalid key length provided to cipher.
    InvalidKeyLen { expected: usize, actual: usize },

    /// Nonce length mismatch (must be 12 bytes for supported ciphers).
    InvalidNonceLen { expected: usize, actual: usize },

    /// PBKDF2 work factor outside the accepted window.
    InvalidKdfIterations { iterations: u32, min: u32, max: u32 },

    /// Envelope bytes too short or otherwise unparsable.
    MalformedEnvelope(String),

    /// Passphrase must not be empty.
    EmptyPassphrase,

    /// AEAD tag mismatch (wrong passphrase or tampered ciphertext).
    TagMismatch,

    /// General runtime error with context.
    Failure(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CryptoError::*;
        match self {
            UnsupportedCipher { cipher_id } =>
                write!(f, "unsupported cipher suite: {}",
                       enum_name_or_hex::<CipherSuite>(*cipher_id)),
            InvalidKeyLen { expected, actual } =>
                write!(f, "invalid key length: expected={}, actual={}", expected, actual),
            InvalidNonceLen { expected, actual } =>
                write!(f, "invalid nonce length: expected={}, actual={}", expected, actual),
            InvalidKdfIterations { iterations, min, max } =>
                write!(f, "invalid KDF iteration count {} (allowed {}..={})", iterations, min, max),
            MalformedEnvelope(msg) =>
                write!(f, "malformed envelope: {}", msg),
            EmptyPassphrase =>
                write!(f, "passphrase must not be empty"),
            TagMismatch =>
                write!(f, "AEAD tag mismatch"),
            Failure(msg) =>
                write!(f, "crypto failure: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<NonceError> for CryptoError {
    fn from(e: NonceError) -> Self {
        CryptoError::MalformedEnvelope(e.to_string())
    }
}

impl From<std::io::Error> for CryptoError {
    fn from(e: std::io::Error) -> Self {
        CryptoError::MalformedEnvelope(e.to_string())
    }
}
