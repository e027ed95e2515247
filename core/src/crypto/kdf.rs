//! crypto/kdf.rs
//! Passphrase-based key derivation (PBKDF2-HMAC-SHA256).
//!
//! Every envelope carries its own salt and iteration count, so a key is
//! derived per seal/open call and never cached.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::constants::{MAX_KDF_ITERATIONS, MIN_KDF_ITERATIONS, SALT_LEN};
use crate::crypto::nonce::validate_salt;
use crate::crypto::types::{CryptoError, KEY_LEN_32};

/// Reject iteration counts below the floor or above the reader's work cap.
#[inline]
pub fn validate_iterations(iterations: u32) -> Result<(), CryptoError> {
    if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&iterations) {
        return Err(CryptoError::InvalidKdfIterations {
            iterations,
            min: MIN_KDF_ITERATIONS,
            max: MAX_KDF_ITERATIONS,
        });
    }
    Ok(())
}

/// Derive a 32-byte AEAD key from `passphrase` and a 16-byte random salt.
///
/// Errors:
/// - `EmptyPassphrase` for an empty passphrase.
/// - `InvalidKdfIterations` outside `[MIN_KDF_ITERATIONS, MAX_KDF_ITERATIONS]`.
/// - `MalformedEnvelope` for an all-zero salt.
pub fn derive_key_32(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    iterations: u32,
) -> Result<[u8; KEY_LEN_32], CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::EmptyPassphrase);
    }
    validate_iterations(iterations)?;
    validate_salt(salt)?;

    let mut key = [0u8; KEY_LEN_32];
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key);
    Ok(key)
}
