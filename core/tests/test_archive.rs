// ## 📘 End-to-end: build, save, open, extract

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use moonball_core::archive::{extract, Archive, ArchiveReader, ArchiveWriter, WriterOptions};
use moonball_core::compression::{CompressionCodec, CompressionScheme};
use moonball_core::config::{ArchiveConfig, ArchiveExtension};
use moonball_core::crypto::{CipherSuite, DigestAlg, Passphrase};
use moonball_core::index::ArchiveIndex;
use moonball_core::types::ArchiveError;
use tempfile::tempdir;

const MIB: usize = 1024 * 1024;

fn pseudo_random(n: usize, seed: u64) -> Vec<u8> {
    let mut x = seed | 1;
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x >> 24) as u8
        })
        .collect()
}

fn text(n: usize) -> Vec<u8> {
    b"moonball archives chunk by chunk; ".iter().copied().cycle().take(n).collect()
}

fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, data).unwrap();
    path
}

fn small_config() -> ArchiveConfig {
    ArchiveConfig {
        chunk_size: 4096,
        workers: Some(2),
        ..ArchiveConfig::default()
    }
}

/// Files of every interesting shape: empty, one byte, multi-chunk text and
/// multi-chunk noise with a short tail.
fn fixture(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let files = vec![
        ("empty.bin".to_string(), Vec::new()),
        ("one.txt".to_string(), vec![b'!']),
        ("story.txt".to_string(), text(3 * 4096 + 17)),
        ("noise.dat".to_string(), pseudo_random(2 * 4096 + 1, 7)),
    ];
    for (name, data) in &files {
        write(dir, name, data);
    }
    files
}

fn assert_extracted(out: &Path, files: &[(String, Vec<u8>)]) {
    for (name, data) in files {
        let restored = fs::read(out.join(name)).unwrap();
        assert_eq!(&restored, data, "{} differs after extraction", name);
    }
}

// ## 1️⃣ Plain round trips

#[test]
fn roundtrip_every_scheme() {
    for scheme in [CompressionScheme::Fast, CompressionScheme::Balanced, CompressionScheme::Max] {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let files = fixture(&src);

        let mut archive = Archive::new(ArchiveConfig { scheme, ..small_config() }).unwrap();
        for (name, _) in &files {
            archive.add_file(src.join(name)).unwrap();
        }
        let path = tmp.path().join("out.mnbl");
        let report = archive.save(&path).unwrap();
        assert_eq!(report.chunk_count as usize, archive.records().len());
        assert_eq!(fs::metadata(&path).unwrap().len(), report.total_len);

        let out = tmp.path().join("restored");
        let extracted = extract(&path, &out, None).unwrap();
        assert_eq!(extracted.files.len(), files.len());
        assert_extracted(&out, &files);
    }
}

#[test]
fn chunk_records_are_contiguous_and_sized() {
    let tmp = tempdir().unwrap();
    let files = fixture(tmp.path());
    let mut archive = Archive::new(small_config()).unwrap();
    for (name, _) in &files {
        archive.add_file(tmp.path().join(name)).unwrap();
    }

    for (name, data) in &files {
        let chunks: Vec<_> = archive.records().iter().filter(|r| &r.source_id == name).collect();
        let expected = data.len().div_ceil(4096).max(1);
        assert_eq!(chunks.len(), expected, "{}", name);
        for (i, r) in chunks.iter().enumerate() {
            assert_eq!(r.chunk_index, i as u64);
            assert_eq!(r.compressed_length, r.payload.len() as u64);
        }
        let total: u64 = chunks.iter().map(|r| r.original_length).sum();
        assert_eq!(total, data.len() as u64);
    }
}

#[test]
fn twelve_mib_file_splits_into_three_chunks() {
    let tmp = tempdir().unwrap();
    let data = text(12 * MIB);
    let src = write(tmp.path(), "big.txt", &data);

    let mut archive = Archive::new(ArchiveConfig::default()).unwrap();
    archive.add_file(&src).unwrap();
    let lens: Vec<u64> = archive.records().iter().map(|r| r.original_length).collect();
    assert_eq!(lens, vec![5 * MIB as u64, 5 * MIB as u64, 2 * MIB as u64]);

    let path = tmp.path().join("big.mnbl");
    archive.save(&path).unwrap();
    let out = tmp.path().join("out");
    extract(&path, &out, None).unwrap();
    assert_eq!(fs::read(out.join("big.txt")).unwrap(), data);
}

#[test]
fn every_digest_algorithm_roundtrips() {
    for digest_alg in [DigestAlg::Sha256, DigestAlg::Sha512, DigestAlg::Blake3] {
        let tmp = tempdir().unwrap();
        let src = write(tmp.path(), "a.txt", &text(10_000));
        let mut archive = Archive::new(ArchiveConfig { digest_alg, ..small_config() }).unwrap();
        archive.add_file(&src).unwrap();

        let path = tmp.path().join("a.mnbl");
        archive.save(&path).unwrap();
        let opened = ArchiveReader::open(&path, None).unwrap();
        assert_eq!(opened.header().digest_alg().unwrap(), digest_alg);
        assert_eq!(opened.index().len(), archive.records().len());
    }
}

// ## 2️⃣ Encrypted round trips

#[test]
fn encrypted_roundtrip_both_ciphers() {
    for cipher in [CipherSuite::Aes256Gcm, CipherSuite::Chacha20Poly1305] {
        let tmp = tempdir().unwrap();
        let files = vec![
            ("empty.bin".to_string(), Vec::new()),
            ("note.txt".to_string(), text(5000)),
        ];
        for (name, data) in &files {
            write(tmp.path(), name, data);
        }

        let mut archive = Archive::new(ArchiveConfig { cipher, ..small_config() })
            .unwrap()
            .with_passphrase("correct horse")
            .unwrap();
        for (name, _) in &files {
            archive.add_file(tmp.path().join(name)).unwrap();
        }
        let path = tmp.path().join("secret.mnbl");
        archive.save(&path).unwrap();

        let raw = fs::read(&path).unwrap();
        assert!(!raw.windows(16).any(|w| w == &files[1].1[..16]), "plaintext leaked into container");

        let out = tmp.path().join("out");
        extract(&path, &out, Some("correct horse")).unwrap();
        assert_extracted(&out, &files);
    }
}

#[test]
fn encrypted_without_passphrase_is_missing_key() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"classified");
    let mut archive = Archive::new(small_config()).unwrap().with_passphrase("pw").unwrap();
    archive.add_file(&src).unwrap();
    let path = tmp.path().join("a.mnbl");
    archive.save(&path).unwrap();

    assert!(matches!(ArchiveReader::open(&path, None), Err(ArchiveError::MissingKey)));
    let out = tmp.path().join("out");
    assert!(matches!(extract(&path, &out, None), Err(ArchiveError::MissingKey)));
    assert!(!out.exists());
}

#[test]
fn wrong_passphrase_is_authentication_error() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"classified");
    let mut archive = Archive::new(small_config()).unwrap().with_passphrase("right").unwrap();
    archive.add_file(&src).unwrap();
    let path = tmp.path().join("a.mnbl");
    archive.save(&path).unwrap();

    let wrong = Passphrase::new("wrong").unwrap();
    assert!(matches!(ArchiveReader::open(&path, Some(&wrong)), Err(ArchiveError::Authentication(_))));
}

#[test]
fn passphrase_on_plain_archive_is_ignored() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"open book");
    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file(&src).unwrap();
    let path = tmp.path().join("a.mnbl");
    archive.save(&path).unwrap();

    let out = tmp.path().join("out");
    extract(&path, &out, Some("unused")).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"open book");
}

#[test]
fn empty_passphrase_on_plain_archive_is_ignored() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"open book");
    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file(&src).unwrap();
    let path = tmp.path().join("a.mnbl");
    archive.save(&path).unwrap();

    let out = tmp.path().join("out");
    extract(&path, &out, Some("")).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"open book");
}

#[test]
fn empty_passphrase_on_encrypted_archive_is_missing_key() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"classified");
    let mut archive = Archive::new(small_config()).unwrap().with_passphrase("pw").unwrap();
    archive.add_file(&src).unwrap();
    let path = tmp.path().join("a.mnbl");
    archive.save(&path).unwrap();

    let out = tmp.path().join("out");
    assert!(matches!(extract(&path, &out, Some("")), Err(ArchiveError::MissingKey)));
    assert!(!out.exists());
}

// ## 3️⃣ Paths, names and extensions

#[test]
fn wrong_extension_fails_before_writing() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"data");
    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file(&src).unwrap();

    let bad = tmp.path().join("archive.xyz");
    assert!(matches!(archive.save(&bad), Err(ArchiveError::InvalidFormat(_))));
    assert!(!bad.exists());
    assert!(matches!(ArchiveReader::open(&bad, None), Err(ArchiveError::InvalidFormat(_))));
}

#[test]
fn moon_extension_roundtrips() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"full moon");
    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file(&src).unwrap();

    let path = ArchiveExtension::Moon.file_name_in(tmp.path(), "night");
    assert!(path.to_string_lossy().ends_with(".\u{1F315}"));
    archive.save(&path).unwrap();

    let out = tmp.path().join("out");
    extract(&path, &out, None).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"full moon");
    assert_eq!(ArchiveExtension::Mnbl.default_file_name(), "archive.mnbl");
}

#[test]
fn directory_ingest_keeps_relative_names() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    let files = vec![
        ("top.txt".to_string(), text(100)),
        ("sub/inner.txt".to_string(), text(9000)),
        ("sub/deeper/leaf.bin".to_string(), pseudo_random(5000, 3)),
    ];
    for (name, data) in &files {
        write(&root, name, data);
    }

    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_directory(&root).unwrap();
    assert_eq!(archive.source_count(), 3);
    assert!(archive.contains_source("sub/deeper/leaf.bin"));

    let path = tmp.path().join("tree.mnbl");
    archive.save(&path).unwrap();
    let out = tmp.path().join("out");
    extract(&path, &out, None).unwrap();
    assert_extracted(&out, &files);
}

#[test]
fn duplicate_sources_are_rejected() {
    let tmp = tempdir().unwrap();
    let a = write(tmp.path(), "x/a.txt", b"first");
    let b = write(tmp.path(), "y/a.txt", b"second");

    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file(&a).unwrap();
    assert!(matches!(archive.add_file(&b), Err(ArchiveError::DuplicateSource(id)) if id == "a.txt"));
    archive.add_file_as(&b, "a-second.txt").unwrap();

    let mut fresh = Archive::new(small_config()).unwrap();
    assert!(matches!(fresh.add_files([&a, &b]), Err(ArchiveError::DuplicateSource(_))));
    assert!(fresh.records().is_empty());
}

#[test]
fn unsafe_source_ids_stay_inside_output_dir() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"escape attempt");
    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file_as(&src, "../../etc/evil.txt").unwrap();
    let path = tmp.path().join("a.mnbl");
    archive.save(&path).unwrap();

    let out = tmp.path().join("out");
    let report = extract(&path, &out, None).unwrap();
    assert_eq!(report.files, vec![out.join("etc/evil.txt")]);
    assert_eq!(fs::read(out.join("etc/evil.txt")).unwrap(), b"escape attempt");
}

#[test]
fn missing_input_file_is_io_error() {
    let tmp = tempdir().unwrap();
    let mut archive = Archive::new(small_config()).unwrap();
    assert!(matches!(archive.add_file(tmp.path().join("nope.txt")), Err(ArchiveError::Io(_))));
}

// ## 4️⃣ Writer contract

#[test]
fn writer_rejects_mismatched_payloads() {
    let tmp = tempdir().unwrap();
    let mut archive = Archive::new(small_config()).unwrap();
    archive.add_file(write(tmp.path(), "a.txt", b"abc")).unwrap();
    let index = ArchiveIndex::from_records(archive.records());

    let writer = ArchiveWriter::new(WriterOptions::default());
    let path = tmp.path().join("w.mnbl");

    assert!(matches!(writer.write(&path, &index, &[]), Err(ArchiveError::Validation(_))));
    let wrong = vec![Bytes::from_static(b"not the payload")];
    assert!(matches!(writer.write(&path, &index, &wrong), Err(ArchiveError::Validation(_))));
    assert!(!path.exists());

    let right: Vec<Bytes> = archive.records().iter().map(|r| r.payload.clone()).collect();
    writer.write(&path, &index, &right).unwrap();
    assert!(path.exists());
}

#[test]
fn empty_archive_roundtrips() {
    let tmp = tempdir().unwrap();
    let archive = Archive::new(small_config()).unwrap();
    let path = tmp.path().join("empty.mnbl");
    let report = archive.save(&path).unwrap();
    assert_eq!(report.chunk_count, 0);

    let out = tmp.path().join("out");
    let extracted = extract(&path, &out, None).unwrap();
    assert!(extracted.files.is_empty());
}

#[test]
fn fixed_predictor_controls_codec() {
    use moonball_core::compression::FixedPredictor;
    use std::sync::Arc;

    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", &text(10_000));
    let mut archive = Archive::new(small_config())
        .unwrap()
        .with_predictor(Some(Arc::new(FixedPredictor(CompressionCodec::Deflate.id()))));
    archive.add_file(&src).unwrap();
    assert!(archive.records().iter().all(|r| r.codec == CompressionCodec::Deflate));

    let mut fallback = Archive::new(small_config()).unwrap().with_predictor(None);
    fallback.add_file(&src).unwrap();
    assert!(fallback.records().iter().all(|r| r.codec == CompressionCodec::Zstd));
}

// ## 5️⃣ Cancellation and named saves

#[test]
fn cancelled_batch_reports_skipped_sources() {
    let tmp = tempdir().unwrap();
    let a = write(tmp.path(), "a.txt", b"alpha");
    let b = write(tmp.path(), "b.txt", b"beta");
    let mut archive = Archive::new(small_config()).unwrap();

    archive.cancel_token().cancel();
    match archive.add_files([&a, &b]) {
        Err(ArchiveError::Cancelled { skipped }) => assert_eq!(skipped, vec!["a.txt", "b.txt"]),
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert!(archive.records().is_empty());
    assert_eq!(archive.source_count(), 0);

    // The token is re-armed, so the same files can be added afterwards.
    assert!(!archive.cancel_token().is_cancelled());
    archive.add_files([&a, &b]).unwrap();
    assert_eq!(archive.source_count(), 2);
}

#[test]
fn save_in_uses_configured_extension() {
    let tmp = tempdir().unwrap();
    let src = write(tmp.path(), "a.txt", b"full moon");

    let config = ArchiveConfig { extension: ArchiveExtension::Moon, ..small_config() };
    let mut archive = Archive::new(config).unwrap();
    archive.add_file(&src).unwrap();

    let report = archive.save_in(tmp.path(), "night").unwrap();
    assert_eq!(report.path, tmp.path().join("night.\u{1F315}"));
    assert!(report.path.exists());

    let out = tmp.path().join("out");
    extract(&report.path, &out, None).unwrap();
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"full moon");

    assert!(matches!(archive.save_in(tmp.path(), ""), Err(ArchiveError::Validation(_))));
}
