// ## 📘 Passphrase envelope, KDF and digest frames
//
// PBKDF2 runs at the minimum work factor on every seal/open, so each test
// keeps the number of envelopes small.

use moonball_core::constants::{MAX_KDF_ITERATIONS, MIN_KDF_ITERATIONS};
use moonball_core::crypto::{
    build_aad, decrypt, derive_key_32, encrypt, open_with, random_salt, AadContext, CipherSuite, CryptoError,
    DigestAlg, DigestError, DigestFrame, Envelope, EnvelopeConfig, Passphrase, Sealer,
};

fn pass(s: &str) -> Passphrase {
    Passphrase::new(s).unwrap()
}

// ## 1️⃣ Round trips

#[test]
fn envelope_roundtrip_both_ciphers() {
    for cipher in [CipherSuite::Aes256Gcm, CipherSuite::Chacha20Poly1305] {
        let config = EnvelopeConfig { cipher, ..EnvelopeConfig::default() };
        let env = encrypt(b"attack at dawn", &pass("hunter2"), &config, &AadContext::Index).unwrap();
        assert_eq!(env.cipher, cipher);
        assert_eq!(env.ciphertext.len(), 14 + 16);

        let decoded = Envelope::decode(&env.encode()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decrypt(&decoded, &pass("hunter2"), &AadContext::Index).unwrap(), b"attack at dawn");
    }
}

#[test]
fn empty_plaintext_is_allowed() {
    let sealer = Sealer::new(pass("pw"), EnvelopeConfig::default()).unwrap();
    let sealed = sealer.seal(&[], &AadContext::Footer).unwrap();
    assert_eq!(sealed.len(), Envelope::OVERHEAD);
    assert!(sealer.open(&sealed, &AadContext::Footer).unwrap().is_empty());
}

#[test]
fn salts_and_nonces_are_fresh() {
    let config = EnvelopeConfig::default();
    let a = encrypt(b"same", &pass("pw"), &config, &AadContext::Index).unwrap();
    let b = encrypt(b"same", &pass("pw"), &config, &AadContext::Index).unwrap();
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

// ## 2️⃣ Authentication failures

#[test]
fn wrong_passphrase_fails() {
    let sealer = Sealer::new(pass("right"), EnvelopeConfig::default()).unwrap();
    let sealed = sealer.seal(b"secret", &AadContext::Index).unwrap();
    assert!(matches!(
        open_with(&pass("wrong"), &sealed, &AadContext::Index),
        Err(CryptoError::TagMismatch)
    ));
}

#[test]
fn aad_binds_position() {
    let sealer = Sealer::new(pass("pw"), EnvelopeConfig::default()).unwrap();
    let ctx = AadContext::Chunk { source_id: "a.txt", chunk_index: 0 };
    let sealed = sealer.seal(b"chunk", &ctx).unwrap();

    let moved = AadContext::Chunk { source_id: "a.txt", chunk_index: 1 };
    let renamed = AadContext::Chunk { source_id: "b.txt", chunk_index: 0 };
    assert!(matches!(sealer.open(&sealed, &moved), Err(CryptoError::TagMismatch)));
    assert!(matches!(sealer.open(&sealed, &renamed), Err(CryptoError::TagMismatch)));
    assert!(matches!(sealer.open(&sealed, &AadContext::Index), Err(CryptoError::TagMismatch)));
}

#[test]
fn tampered_header_fields_fail() {
    let sealer = Sealer::new(pass("pw"), EnvelopeConfig::default()).unwrap();
    let sealed = sealer.seal(b"payload", &AadContext::Index).unwrap();

    // Flip one salt byte and one ciphertext byte.
    for pos in [6, Envelope::HEADER_LEN + 1] {
        let mut bad = sealed.clone();
        bad[pos] ^= 0x01;
        assert!(sealer.open(&bad, &AadContext::Index).is_err());
    }
}

#[test]
fn aad_differs_per_domain() {
    let header = [0u8; Envelope::HEADER_LEN];
    let index = build_aad(&AadContext::Index, &header);
    let footer = build_aad(&AadContext::Footer, &header);
    assert_ne!(index, footer);
    assert!(index.starts_with(b"MNB1"));
}

// ## 3️⃣ Malformed input

#[test]
fn short_envelope_is_malformed() {
    assert!(matches!(Envelope::decode(&[0u8; 10]), Err(CryptoError::MalformedEnvelope(_))));
}

#[test]
fn unknown_cipher_is_rejected() {
    let mut bytes = vec![0u8; Envelope::OVERHEAD];
    bytes[0] = 0x99;
    assert!(matches!(Envelope::decode(&bytes), Err(CryptoError::UnsupportedCipher { cipher_id: 0x99 })));
}

#[test]
fn out_of_range_iterations_rejected_on_open() {
    let env = encrypt(b"x", &pass("pw"), &EnvelopeConfig::default(), &AadContext::Index).unwrap();
    let mut bad = env.clone();
    bad.kdf_iterations = MAX_KDF_ITERATIONS + 1;
    assert!(matches!(
        decrypt(&bad, &pass("pw"), &AadContext::Index),
        Err(CryptoError::InvalidKdfIterations { .. })
    ));
}

#[test]
fn config_and_passphrase_validation() {
    assert!(matches!(Passphrase::new(""), Err(CryptoError::EmptyPassphrase)));
    let weak = EnvelopeConfig { kdf_iterations: MIN_KDF_ITERATIONS - 1, ..EnvelopeConfig::default() };
    assert!(Sealer::new(pass("pw"), weak).is_err());
    assert_eq!(format!("{:?}", pass("hunter2")), "Passphrase(<redacted>)");
}

// ## 4️⃣ KDF

#[test]
fn kdf_is_deterministic_per_salt() {
    let salt = random_salt();
    let a = derive_key_32(b"pw", &salt, MIN_KDF_ITERATIONS).unwrap();
    let b = derive_key_32(b"pw", &salt, MIN_KDF_ITERATIONS).unwrap();
    assert_eq!(a, b);
    let c = derive_key_32(b"pw", &random_salt(), MIN_KDF_ITERATIONS).unwrap();
    assert_ne!(a, c);
}

#[test]
fn kdf_rejects_bad_inputs() {
    let salt = random_salt();
    assert!(derive_key_32(b"", &salt, MIN_KDF_ITERATIONS).is_err());
    assert!(derive_key_32(b"pw", &[0u8; 16], MIN_KDF_ITERATIONS).is_err());
    assert!(derive_key_32(b"pw", &salt, 1).is_err());
}

// ## 5️⃣ Digest frames

#[test]
fn digest_frame_roundtrip_all_algorithms() {
    for alg in [DigestAlg::Sha256, DigestAlg::Sha512, DigestAlg::Blake3] {
        let frame = DigestFrame::compute(alg, b"index bytes");
        assert_eq!(frame.digest.len(), alg.output_len());
        let decoded = DigestFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        decoded.verify(b"index bytes").unwrap();
        assert!(matches!(decoded.verify(b"index bytez"), Err(DigestError::DigestMismatch)));
    }
}

#[test]
fn digest_frame_rejects_bad_wire() {
    assert!(matches!(DigestFrame::decode(&[0, 1]), Err(DigestError::InvalidFormat)));

    let mut unknown = DigestFrame::compute(DigestAlg::Sha256, b"x").encode();
    unknown[1] = 0x42;
    assert!(DigestFrame::decode(&unknown).is_err());

    let mut short = DigestFrame::compute(DigestAlg::Sha256, b"x").encode();
    short.pop();
    assert!(matches!(DigestFrame::decode(&short), Err(DigestError::InvalidLength { .. })));
}
