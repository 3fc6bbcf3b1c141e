use blockpress::api;
use blockpress::codec::{AlgorithmId, CodecError};
use blockpress::container;
use blockpress::parallel::{ParallelCompressor, ParallelOptions};
use blockpress::registry;
use blockpress::Codec;
use std::fs;
use tempfile::{tempdir, NamedTempFile};

fn corpus() -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..300u32 {
        data.extend_from_slice(format!("line {i:04}: the rain in spain stays mainly in the plain\n").as_bytes());
    }
    data.extend(std::iter::repeat(0u8).take(2000));
    data.extend((0..=255u8).cycle().take(1500));
    data
}

#[test]
fn test_every_registered_codec_roundtrips() {
    let data = corpus();
    for name in registry::list() {
        let codec = registry::create(name).unwrap();
        let enc = codec.compress(&data).unwrap();
        assert_eq!(codec.decompress(&enc).unwrap(), data, "{name}");
    }
}

#[test]
fn test_rle_concrete_example() {
    let rle = registry::create("rle").unwrap();
    assert_eq!(rle.compress(b"aaaaaa").unwrap(), vec![6, b'a']);
    assert_eq!(rle.decompress(&[6, b'a']).unwrap(), b"aaaaaa");
}

#[test]
fn test_window_codecs_beat_literals_on_repeats() {
    let data = b"ABABABABAB";
    for name in ["lz77", "lzss"] {
        let enc = registry::create(name).unwrap().compress(data).unwrap();
        let literal_size = match name {
            "lz77" => data.len() * 2,
            _      => 12 + 2 + data.len(),
        };
        assert!(enc.len() < literal_size, "{name}: {} bytes", enc.len());
    }
}

#[test]
fn test_file_roundtrip_single_container() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("input.txt");
    let packed = dir.path().join("input.bp");
    let restored = dir.path().join("restored.txt");
    fs::write(&src, corpus()).unwrap();

    api::compress_file(&src, &packed, AlgorithmId::Bwt).unwrap();
    let raw = fs::read(&packed).unwrap();
    assert_eq!(raw[0], container::MAGIC);
    assert_eq!(raw[1], AlgorithmId::Bwt.as_byte());

    api::decompress_file(&packed, &restored).unwrap();
    assert_eq!(fs::read(&restored).unwrap(), corpus());
}

#[test]
fn test_file_roundtrip_parallel() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("input.bin");
    let packed = dir.path().join("input.bpp");
    let restored = dir.path().join("restored.bin");
    fs::write(&src, corpus()).unwrap();

    let options = ParallelOptions { block_size: 4096, threads: 3 };
    api::compress_file_parallel(&src, &packed, AlgorithmId::Lzw, options).unwrap();
    assert_eq!(fs::read(&packed).unwrap()[0], 0xC4);

    api::decompress_file_parallel(&packed, &restored, AlgorithmId::Lzw, 2).unwrap();
    assert_eq!(fs::read(&restored).unwrap(), corpus());
}

#[test]
fn test_missing_input_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = api::compress_file(&dir.path().join("nope"), &dir.path().join("out"), AlgorithmId::Rle).unwrap_err();
    assert!(matches!(err, CodecError::Io(_)));
}

#[test]
fn test_garbage_file_is_malformed() {
    let garbage = NamedTempFile::new().unwrap();
    fs::write(garbage.path(), b"\x00not a container").unwrap();
    let out = NamedTempFile::new().unwrap();
    let err = api::decompress_file(garbage.path(), out.path()).unwrap_err();
    assert!(matches!(err, CodecError::MalformedContainer(_)));
}

#[test]
fn test_corrupted_payload_is_reported_not_returned() {
    let data = corpus();
    let mut packed = api::compress_bytes(AlgorithmId::Lz77, &data).unwrap();
    // First token is a literal; turn it into a match that reaches back past the start.
    packed[container::HEADER_SIZE]     = 5;
    packed[container::HEADER_SIZE + 1] = 0x40;
    assert!(matches!(
        api::decompress_bytes(&packed),
        Err(CodecError::CorruptPayload { codec: "lz77", .. })
    ));
}

#[test]
fn test_parallel_compressor_as_plain_codec() {
    let data = corpus();
    let codecs: Vec<Box<dyn Codec>> = AlgorithmId::ALL
        .iter()
        .map(|&id| Box::new(ParallelCompressor::new(id, ParallelOptions { block_size: 5000, threads: 2 })) as Box<dyn Codec>)
        .collect();
    for codec in &codecs {
        assert!(codec.name().starts_with("parallel_"));
        let enc = codec.compress(&data).unwrap();
        assert_eq!(codec.decompress(&enc).unwrap(), data, "{}", codec.name());
    }
}
