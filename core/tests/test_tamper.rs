// ## 🧪 Tamper and corruption detection
//
// Every flipped byte in a saved container must surface as a typed error,
// and a failed extraction must not leave output files behind.

use std::fs;
use std::path::{Path, PathBuf};

use moonball_core::archive::{extract, Archive, ArchiveReader, WriteReport};
use moonball_core::config::ArchiveConfig;
use moonball_core::headers::HEADER_LEN_V1;
use moonball_core::types::ArchiveError;
use tempfile::{tempdir, TempDir};
use walkdir::WalkDir;

fn text(n: usize, salt: u8) -> Vec<u8> {
    (0..n).map(|i| b'a' + ((i as u8).wrapping_mul(7).wrapping_add(salt) % 26)).collect()
}

fn build(passphrase: Option<&str>) -> (TempDir, PathBuf, WriteReport) {
    let tmp = tempdir().unwrap();
    let config = ArchiveConfig { chunk_size: 2048, workers: Some(2), ..ArchiveConfig::default() };
    let mut archive = Archive::new(config).unwrap();
    if let Some(p) = passphrase {
        archive = archive.with_passphrase(p).unwrap();
    }
    for (name, salt) in [("first.txt", 1u8), ("second.txt", 2u8)] {
        let path = tmp.path().join(name);
        fs::write(&path, text(3000, salt)).unwrap();
        archive.add_file(&path).unwrap();
    }
    let path = tmp.path().join("t.mnbl");
    let report = archive.save(&path).unwrap();
    (tmp, path, report)
}

fn flip(path: &Path, offset: u64) {
    let mut bytes = fs::read(path).unwrap();
    bytes[offset as usize] ^= 0x01;
    fs::write(path, bytes).unwrap();
}

fn output_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

// ## 1️⃣ Header and framing

#[test]
fn header_flip_is_invalid_format() {
    let (_tmp, path, _) = build(None);
    flip(&path, 5);
    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::InvalidFormat(_))));
}

#[test]
fn bad_magic_is_invalid_format() {
    let (_tmp, path, _) = build(None);
    flip(&path, 0);
    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::InvalidFormat(_))));
}

#[test]
fn truncated_container_is_invalid_format() {
    let (_tmp, path, report) = build(None);
    let bytes = fs::read(&path).unwrap();
    let cut = HEADER_LEN_V1 as u64 + report.index_len + report.body_len;
    fs::write(&path, &bytes[..cut as usize]).unwrap();
    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::InvalidFormat(_))));

    fs::write(&path, &bytes[..10]).unwrap();
    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::InvalidFormat(_))));
}

#[test]
fn appended_garbage_fails() {
    let (_tmp, path, _) = build(None);
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(b"trailing");
    fs::write(&path, bytes).unwrap();
    assert!(ArchiveReader::open(&path, None).is_err());
}

// ## 2️⃣ Index and footer

#[test]
fn index_flip_is_integrity_error() {
    let (_tmp, path, _) = build(None);
    flip(&path, HEADER_LEN_V1 as u64 + 3);
    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::Integrity(_))));
}

#[test]
fn footer_flip_is_integrity_error() {
    let (_tmp, path, report) = build(None);
    flip(&path, report.total_len - 1);
    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::Integrity(_))));
}

#[test]
fn encrypted_footer_flip_is_integrity_error() {
    let (_tmp, path, report) = build(Some("pw"));
    flip(&path, report.total_len - 1);
    let pass = moonball_core::crypto::Passphrase::new("pw").unwrap();
    assert!(matches!(ArchiveReader::open(&path, Some(&pass)), Err(ArchiveError::Integrity(_))));
}

#[test]
fn encrypted_index_flip_is_authentication_error() {
    let (_tmp, path, _) = build(Some("pw"));
    flip(&path, HEADER_LEN_V1 as u64 + 60);
    let pass = moonball_core::crypto::Passphrase::new("pw").unwrap();
    assert!(matches!(ArchiveReader::open(&path, Some(&pass)), Err(ArchiveError::Authentication(_))));
}

// ## 3️⃣ Chunk blocks

#[test]
fn chunk_flip_is_corrupt_chunk_and_leaves_nothing() {
    let (tmp, path, report) = build(None);
    let opened = ArchiveReader::open(&path, None).unwrap();
    let last = opened.index().entries.last().unwrap().clone();
    drop(opened);

    // Last byte of the body belongs to the last chunk of the last source.
    flip(&path, HEADER_LEN_V1 as u64 + report.index_len + report.body_len - 1);

    let out = tmp.path().join("out");
    match extract(&path, &out, None) {
        Err(ArchiveError::CorruptChunk { source_id, chunk_index, .. }) => {
            assert_eq!(source_id, last.source_id);
            assert_eq!(chunk_index, last.chunk_index);
        }
        other => panic!("expected CorruptChunk, got {:?}", other.map(|r| r.files)),
    }
    assert_eq!(output_files(&out), 0);
}

#[test]
fn encrypted_chunk_flip_is_corrupt_chunk() {
    let (tmp, path, report) = build(Some("pw"));
    flip(&path, HEADER_LEN_V1 as u64 + report.index_len + 10);

    let out = tmp.path().join("out");
    assert!(matches!(
        extract(&path, &out, Some("pw")),
        Err(ArchiveError::CorruptChunk { chunk_index: 0, .. })
    ));
    assert_eq!(output_files(&out), 0);
}

#[test]
fn untouched_container_still_extracts() {
    let (tmp, path, _) = build(None);
    let out = tmp.path().join("out");
    let report = extract(&path, &out, None).unwrap();
    assert_eq!(report.files.len(), 2);
    assert_eq!(output_files(&out), 2);
    assert_eq!(fs::read(out.join("second.txt")).unwrap(), text(3000, 2));
}
