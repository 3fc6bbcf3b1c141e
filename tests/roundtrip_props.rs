use blockpress::codec::AlgorithmId;
use blockpress::container;
use blockpress::parallel::parallel_compress;
use blockpress::registry;
use proptest::prelude::*;

fn algorithm() -> impl Strategy<Value = AlgorithmId> {
    prop::sample::select(AlgorithmId::ALL.to_vec())
}

/// Bytes drawn from a small alphabet so the dictionary codecs find matches.
fn repetitive_bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcab\x00\xff".to_vec()), 0..max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn codec_roundtrips_arbitrary_bytes(id in algorithm(), data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let codec = registry::create_by_id(id);
        let enc = codec.compress(&data).unwrap();
        prop_assert_eq!(codec.decompress(&enc).unwrap(), data);
    }

    #[test]
    fn codec_roundtrips_repetitive_bytes(id in algorithm(), data in repetitive_bytes(4096)) {
        let codec = registry::create_by_id(id);
        let enc = codec.compress(&data).unwrap();
        prop_assert_eq!(codec.decompress(&enc).unwrap(), data);
    }

    #[test]
    fn container_pack_unpack_identity(id in algorithm(), size in any::<u64>(), payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let c = container::unpack(&container::pack(id, size, &payload)).unwrap();
        prop_assert_eq!(c.algorithm, id);
        prop_assert_eq!(c.original_size, size);
        prop_assert_eq!(c.payload, payload);
    }

    #[test]
    fn parallel_roundtrip_is_thread_independent(
        id in algorithm(),
        data in repetitive_bytes(3000),
        block_size in 1usize..4000,
        threads in 1usize..5,
    ) {
        let one  = parallel_compress(&data, id.name(), block_size, 1).unwrap();
        let many = parallel_compress(&data, id.name(), block_size, threads).unwrap();
        prop_assert_eq!(&one, &many);
        let back = blockpress::parallel_decompress(&many, id.name(), threads).unwrap();
        prop_assert_eq!(back, data);
    }
}
