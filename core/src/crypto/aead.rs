//! src/crypto/aead.rs
//! AEAD interface for AES-256-GCM and ChaCha20-Poly1305.
//!
//! Design notes:
//! - Both ciphers use 32-byte keys and 12-byte nonces.
//! - Tag verification fails closed (no partial plaintext).
//! - Caller provides nonce and AAD per envelope.

// Import AEAD traits from aes_gcm's re-export to avoid duplicates.
use aes_gcm::aead::{Aead, KeyInit, Payload};

use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaNonce};

use crate::crypto::nonce::validate_nonce_len;
use crate::crypto::types::{CipherSuite, CryptoError, KEY_LEN_32, NONCE_LEN_12, TAG_LEN};

/// Unified AEAD cipher implementation selected by `CipherSuite`.
#[derive(Clone)]
pub enum AeadImpl {
    AesGcm(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

impl AeadImpl {
    pub fn new(suite: CipherSuite, key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN_32 {
            return Err(CryptoError::InvalidKeyLen { expected: KEY_LEN_32, actual: key.len() });
        }
        let bad_len = || CryptoError::InvalidKeyLen { expected: KEY_LEN_32, actual: key.len() };
        match suite {
            CipherSuite::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map(Self::AesGcm)
                .map_err(|_| bad_len()),
            CipherSuite::Chacha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
                .map(Self::ChaCha)
                .map_err(|_| bad_len()),
        }
    }

    /// Seal plaintext with nonce and AAD. Empty plaintext yields a bare tag.
    pub fn seal(&self, nonce_12: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        validate_nonce_len(nonce_12.len()).map_err(|_| CryptoError::InvalidNonceLen {
            expected: NONCE_LEN_12,
            actual: nonce_12.len(),
        })?;

        let payload = Payload { msg: plaintext, aad };
        match self {
            AeadImpl::AesGcm(cipher) => cipher
                .encrypt(AesNonce::from_slice(nonce_12), payload)
                .map_err(|_| CryptoError::Failure("AES-GCM seal failed".into())),
            AeadImpl::ChaCha(cipher) => cipher
                .encrypt(ChaNonce::from_slice(nonce_12), payload)
                .map_err(|_| CryptoError::Failure("ChaCha20-Poly1305 seal failed".into())),
        }
    }

    pub fn open(&self, nonce_12: &[u8], aad: &[u8], ciphertext_and_tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
        validate_nonce_len(nonce_12.len()).map_err(|_| CryptoError::InvalidNonceLen {
            expected: NONCE_LEN_12,
            actual: nonce_12.len(),
        })?;

        if ciphertext_and_tag.len() < TAG_LEN {
            return Err(CryptoError::MalformedEnvelope("ciphertext too short".into()));
        }

        let payload = Payload { msg: ciphertext_and_tag, aad };
        match self {
            AeadImpl::AesGcm(cipher) => cipher
                .decrypt(AesNonce::from_slice(nonce_12), payload)
                .map_err(|_| CryptoError::TagMismatch),
            AeadImpl::ChaCha(cipher) => cipher
                .decrypt(ChaNonce::from_slice(nonce_12), payload)
                .map_err(|_| CryptoError::TagMismatch),
        }
    }
}
