//! crypto/envelope.rs
//! Passphrase envelope: PBKDF2 key derivation + AEAD seal.
//!
//! Wire format (little endian):
//!
//! ```text
//! [ cipher u16 ][ kdf_iterations u32 ][ salt 16 ][ nonce 12 ][ ciphertext + tag ]
//! ```
//!
//! Salt and nonce are fresh OS randomness per seal, so sealing the same
//! plaintext twice never produces the same bytes.

use std::fmt;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_KDF_ITERATIONS, SALT_LEN};
use crate::crypto::aad::{build_aad, AadContext};
use crate::crypto::aead::AeadImpl;
use crate::crypto::kdf::{derive_key_32, validate_iterations};
use crate::crypto::nonce::{random_nonce_12, random_salt};
use crate::crypto::types::{CipherSuite, CryptoError, NONCE_LEN_12, TAG_LEN};

/// Cipher choice and PBKDF2 work factor for new envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub cipher: CipherSuite,
    pub kdf_iterations: u32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            cipher: CipherSuite::default(),
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl EnvelopeConfig {
    pub fn validate(&self) -> Result<(), CryptoError> {
        validate_iterations(self.kdf_iterations)
    }
}

/// Passphrase wrapper; `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(secret: impl Into<String>) -> Result<Self, CryptoError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(CryptoError::EmptyPassphrase);
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub cipher: CipherSuite,
    pub kdf_iterations: u32,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN_12],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// `cipher + iterations + salt + nonce`
    pub const HEADER_LEN: usize = 2 + 4 + SALT_LEN + NONCE_LEN_12;
    /// Fixed bytes added to any plaintext.
    pub const OVERHEAD: usize = Self::HEADER_LEN + TAG_LEN;

    fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN);
        // Writes into a Vec cannot fail.
        let _ = out.write_u16::<LittleEndian>(self.cipher as u16);
        let _ = out.write_u32::<LittleEndian>(self.kdf_iterations);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header_bytes();
        out.reserve(self.ciphertext.len());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < Self::OVERHEAD {
            return Err(CryptoError::MalformedEnvelope(format!(
                "{} bytes, need at least {}",
                bytes.len(),
                Self::OVERHEAD
            )));
        }

        let mut rdr = Cursor::new(bytes);
        let raw_cipher = rdr.read_u16::<LittleEndian>()?;
        let cipher = CipherSuite::try_from(raw_cipher)
            .map_err(|_| CryptoError::UnsupportedCipher { cipher_id: raw_cipher })?;
        let kdf_iterations = rdr.read_u32::<LittleEndian>()?;
        let mut salt = [0u8; SALT_LEN];
        rdr.read_exact(&mut salt)?;
        let mut nonce = [0u8; NONCE_LEN_12];
        rdr.read_exact(&mut nonce)?;

        Ok(Self {
            cipher,
            kdf_iterations,
            salt,
            nonce,
            ciphertext: bytes[Self::HEADER_LEN..].to_vec(),
        })
    }
}

/// Seal `plaintext` under a key derived from `passphrase`.
pub fn encrypt(
    plaintext: &[u8],
    passphrase: &Passphrase,
    config: &EnvelopeConfig,
    ctx: &AadContext<'_>,
) -> Result<Envelope, CryptoError> {
    let mut envelope = Envelope {
        cipher: config.cipher,
        kdf_iterations: config.kdf_iterations,
        salt: random_salt(),
        nonce: random_nonce_12(),
        ciphertext: Vec::new(),
    };

    let key = derive_key_32(passphrase.as_bytes(), &envelope.salt, envelope.kdf_iterations)?;
    let aead = AeadImpl::new(envelope.cipher, &key)?;
    let aad = build_aad(ctx, &envelope.header_bytes());
    envelope.ciphertext = aead.seal(&envelope.nonce, &aad, plaintext)?;
    Ok(envelope)
}

/// Open an envelope with the cipher and work factor recorded in it.
pub fn decrypt(
    envelope: &Envelope,
    passphrase: &Passphrase,
    ctx: &AadContext<'_>,
) -> Result<Vec<u8>, CryptoError> {
    let key = derive_key_32(passphrase.as_bytes(), &envelope.salt, envelope.kdf_iterations)?;
    let aead = AeadImpl::new(envelope.cipher, &key)?;
    let aad = build_aad(ctx, &envelope.header_bytes());
    aead.open(&envelope.nonce, &aad, &envelope.ciphertext)
}

/// Passphrase + config bundle used by the ingest pipeline and the writer.
#[derive(Debug, Clone)]
pub struct Sealer {
    passphrase: Passphrase,
    config: EnvelopeConfig,
}

impl Sealer {
    pub fn new(passphrase: Passphrase, config: EnvelopeConfig) -> Result<Self, CryptoError> {
        config.validate()?;
        Ok(Self { passphrase, config })
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    pub fn passphrase(&self) -> &Passphrase {
        &self.passphrase
    }

    /// Seal and encode in one step.
    pub fn seal(&self, plaintext: &[u8], ctx: &AadContext<'_>) -> Result<Vec<u8>, CryptoError> {
        Ok(encrypt(plaintext, &self.passphrase, &self.config, ctx)?.encode())
    }

    /// Decode and open in one step.
    pub fn open(&self, sealed: &[u8], ctx: &AadContext<'_>) -> Result<Vec<u8>, CryptoError> {
        open_with(&self.passphrase, sealed, ctx)
    }
}

/// Decode and open envelope bytes with `passphrase`.
pub fn open_with(passphrase: &Passphrase, sealed: &[u8], ctx: &AadContext<'_>) -> Result<Vec<u8>, CryptoError> {
    let envelope = Envelope::decode(sealed)?;
    decrypt(&envelope, passphrase, ctx)
}
