/// Magic number for the container header.
/// "MNB1" = MoonBall container v1
// Protocol magic field is `[u8; 4]` so the type enforces "exactly 4 bytes" and
// matches the header struct field.
pub const MAGIC_MNB1: [u8; 4] = *b"MNB1";
pub const CONTAINER_V1: u16 = 1;

/// Version stamped into the serialized `ArchiveIndex`.
pub const INDEX_FORMAT_V1: u16 = 1;

/// Defaults when Option<T> is None
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024; // 5 MiB
/// Max chunk size sanity bound (64 MiB).
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Accepted archive extensions (without the leading dot).
pub const EXT_MNBL: &str = "mnbl";
pub const EXT_MOON: &str = "\u{1F315}";
pub const ACCEPTED_EXTENSIONS: &[&str] = &[EXT_MNBL, EXT_MOON];

/// PBKDF2 bounds. The lower bound is a hard floor; the upper bound caps the
/// work an attacker-supplied envelope can force on the reader.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;
pub const MAX_KDF_ITERATIONS: u32 = 10_000_000;
pub const DEFAULT_KDF_ITERATIONS: u32 = MIN_KDF_ITERATIONS;

/// Salt length of one envelope (bytes).
pub const SALT_LEN: usize = 16;

/// Default similarity threshold for semantic search.
pub const DEFAULT_SEARCH_THRESHOLD: f32 = 0.75;

/// Default dimensionality of the built-in hashing embedder.
pub const DEFAULT_EMBEDDING_DIMS: usize = 256;

/// Upper bound on in-flight files in the ingest queue.
pub const MAX_INFLIGHT_FILES: usize = 64;

/// Cipher suite identifiers (mirrored in envelopes).
pub mod cipher_ids {
    pub const AES256_GCM: u16        = 0x0001;
    pub const CHACHA20_POLY1305: u16 = 0x0002;
}

/// Digest algorithm identifiers (mirrored in header + footer).
pub mod digest_ids {
    pub const SHA256: u16 = 0x0001;
    pub const SHA512: u16 = 0x0002;
    pub const BLAKE3: u16 = 0x0003;
}
