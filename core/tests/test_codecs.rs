// ## 📘 Codec set, registry and frame validation

use moonball_core::compression::{
    codec_ids, compress, create_compressor, create_decompressor, decompress, resolve, CompressionCodec,
    CompressionError, CompressionScheme, FRAME_OVERHEAD,
};
use moonball_core::constants::MAX_CHUNK_SIZE;
use proptest::prelude::*;

fn sample_text() -> Vec<u8> {
    b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(64 * 1024)
        .collect()
}

// ## 1️⃣ Registry

#[test]
fn registry_resolves_known_ids() {
    for codec in CompressionCodec::ALL {
        let info = resolve(codec.id()).unwrap();
        assert_eq!(info.name, codec.name());
        create_compressor(codec.id(), None).unwrap();
        create_decompressor(codec.id()).unwrap();
    }
}

#[test]
fn registry_rejects_unknown_id() {
    assert!(matches!(
        create_compressor(0x0099, None),
        Err(CompressionError::UnsupportedCodec { codec_id: 0x0099 })
    ));
    assert!(matches!(
        create_decompressor(0),
        Err(CompressionError::UnsupportedCodec { codec_id: 0 })
    ));
    CompressionCodec::verify(codec_ids::BROTLI).unwrap();
    CompressionCodec::verify(0xFFFF).unwrap_err();
}

#[test]
fn zstd_rejects_out_of_range_level() {
    assert!(matches!(
        create_compressor(codec_ids::ZSTD, Some(10_000)),
        Err(CompressionError::CodecInitFailed { .. })
    ));
}

// ## 2️⃣ Round trips

#[test]
fn every_codec_roundtrips_text() {
    let input = sample_text();
    for codec in CompressionCodec::ALL {
        let framed = compress(codec, None, &input).unwrap();
        assert!(framed.len() < input.len(), "{} should shrink repetitive text", codec.name());
        assert_eq!(decompress(codec, &framed).unwrap(), input, "{}", codec.name());
    }
}

#[test]
fn every_codec_roundtrips_empty() {
    for codec in CompressionCodec::ALL {
        let framed = compress(codec, None, &[]).unwrap();
        assert_eq!(framed.len(), FRAME_OVERHEAD, "{}", codec.name());
        assert!(decompress(codec, &framed).unwrap().is_empty());
    }
}

#[test]
fn every_scheme_level_is_accepted() {
    let input = sample_text();
    for scheme in [CompressionScheme::Fast, CompressionScheme::Balanced, CompressionScheme::Max] {
        for codec in CompressionCodec::ALL {
            let framed = compress(codec, Some(scheme.level_for(codec)), &input).unwrap();
            assert_eq!(decompress(codec, &framed).unwrap(), input);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn codecs_roundtrip_arbitrary(data in proptest::collection::vec(any::<u8>(), 0..8192)) {
        for codec in CompressionCodec::ALL {
            let framed = compress(codec, None, &data).unwrap();
            prop_assert_eq!(decompress(codec, &framed).unwrap(), data.clone());
        }
    }
}

// ## 3️⃣ Corrupt input

#[test]
fn truncated_frame_is_rejected() {
    for codec in CompressionCodec::ALL {
        let err = decompress(codec, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, CompressionError::CodecProcessFailed { .. }), "{}: {:?}", codec.name(), err);
    }
}

#[test]
fn flipped_body_byte_is_rejected() {
    let input = sample_text();
    for codec in CompressionCodec::ALL {
        let mut framed = compress(codec, None, &input).unwrap();
        let mid = framed.len() / 2;
        framed[mid] ^= 0x5A;
        let err = decompress(codec, &framed).unwrap_err();
        assert!(
            matches!(
                err,
                CompressionError::CodecProcessFailed { .. } | CompressionError::ChecksumMismatch { .. }
            ),
            "{}: {:?}",
            codec.name(),
            err
        );
    }
}

#[test]
fn flipped_checksum_is_rejected() {
    let input = sample_text();
    for codec in CompressionCodec::ALL {
        let mut framed = compress(codec, None, &input).unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0x01;
        assert!(matches!(
            decompress(codec, &framed),
            Err(CompressionError::ChecksumMismatch { .. })
        ));
    }
}

#[test]
fn oversized_declared_length_is_rejected() {
    let mut frame = Vec::new();
    frame.extend_from_slice(&((MAX_CHUNK_SIZE as u32) + 1).to_le_bytes());
    frame.extend_from_slice(&[0u8; 16]);
    frame.extend_from_slice(&0u32.to_le_bytes());
    for codec in CompressionCodec::ALL {
        assert!(decompress(codec, &frame).is_err());
    }
}

#[test]
fn empty_frame_with_body_is_rejected() {
    let mut frame = compress(CompressionCodec::Zstd, None, &[]).unwrap();
    frame.insert(4, 0xAA);
    assert!(decompress(CompressionCodec::Zstd, &frame).is_err());
}

// ## 4️⃣ Scheme tiers

#[test]
fn scheme_parses_and_prefers_codecs() {
    assert_eq!("fast".parse::<CompressionScheme>().unwrap(), CompressionScheme::Fast);
    assert_eq!("MAX".parse::<CompressionScheme>().unwrap(), CompressionScheme::Max);
    assert!("ultra".parse::<CompressionScheme>().is_err());

    assert_eq!(CompressionScheme::Fast.preferred_codec(), CompressionCodec::Lz4);
    assert_eq!(CompressionScheme::Balanced.preferred_codec(), CompressionCodec::Zstd);
    assert_eq!(CompressionScheme::Max.preferred_codec(), CompressionCodec::Brotli);
    assert_eq!(CompressionScheme::default(), CompressionScheme::Balanced);
}
