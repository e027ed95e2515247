/// Stable codec IDs (u16) for the index and wire format.
pub mod codec_ids {
    pub const ZSTD: u16    = 0x0001;
    pub const LZ4: u16     = 0x0002;
    pub const DEFLATE: u16 = 0x0003;
    pub const BROTLI: u16  = 0x0004;
}

/// Default compression levels (balanced scheme).
pub const DEFAULT_LEVEL_ZSTD: i32 = 9;
pub const DEFAULT_LEVEL_LZ4: i32 = 0; // block mode has no levels
pub const DEFAULT_LEVEL_DEFLATE: i32 = 6;
pub const DEFAULT_LEVEL_BROTLI: i32 = 6;

/// Brotli window (log2) and internal buffer size.
pub const BROTLI_LGWIN: u32 = 22;
pub const BROTLI_BUFFER: usize = 4096;

/// `[orig_len u32 LE]` prefix + `[crc32 u32 LE]` trailer around codec bytes.
pub const FRAME_PREFIX_LEN: usize = 4;
pub const FRAME_TRAILER_LEN: usize = 4;
pub const FRAME_OVERHEAD: usize = FRAME_PREFIX_LEN + FRAME_TRAILER_LEN;

/// Entropy (bits/byte) at or above which data is treated as incompressible.
pub const HIGH_ENTROPY_BITS: f64 = 7.5;

/// File hints that name already-compressed formats.
pub const PRECOMPRESSED_HINTS: &[&str] = &[
    "7z", "avi", "br", "bz2", "docx", "flac", "gif", "gz", "heic", "jpeg", "jpg",
    "lz4", "mkv", "mov", "mp3", "mp4", "ogg", "pdf", "png", "rar", "webm", "webp",
    "xlsx", "xz", "zip", "zst",
];
