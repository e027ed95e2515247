//! crypto/nonce.rs
//! Fresh salt and nonce material from the OS RNG.
//!
//! Each seal derives a new key from a new salt, so a random 96-bit nonce is
//! never reused under the same key.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::constants::SALT_LEN;
use crate::crypto::types::{NonceError, NONCE_LEN_12};

#[inline]
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

#[inline]
pub fn random_nonce_12() -> [u8; NONCE_LEN_12] {
    let mut nonce = [0u8; NONCE_LEN_12];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Salt must be random per envelope; all-zero is forbidden.
#[inline]
pub fn validate_salt(salt: &[u8; SALT_LEN]) -> Result<(), NonceError> {
    if salt.iter().all(|&b| b == 0) {
        return Err(NonceError::InvalidSalt);
    }
    Ok(())
}

/// Only 12-byte nonces are supported.
#[inline]
pub fn validate_nonce_len(nonce_len: usize) -> Result<(), NonceError> {
    if nonce_len != NONCE_LEN_12 {
        return Err(NonceError::InvalidNonceLen { requested: nonce_len, supported: NONCE_LEN_12 });
    }
    Ok(())
}
