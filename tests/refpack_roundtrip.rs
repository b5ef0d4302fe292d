use bigrf::refpack::{compress, decompress, has_refpack_header};
use bigrf::RefpackConfig;

fn init_logging() {
    let _ = env_logger::try_init();
}

#[test]
fn compress_then_decompress_is_lossless_across_shapes() {
    init_logging();
    let cases: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"x".to_vec(),
        b"abababababababababab".to_vec(),
        (0u8..=255).collect(),
        vec![0u8; 20_000],
        b"The quick brown fox jumps over the lazy dog. ".repeat(500),
    ];

    for input in cases {
        let packed = compress(&input);
        let unpacked = decompress(&packed, RefpackConfig::default()).expect("decode should succeed");
        assert_eq!(unpacked, input, "round trip mismatch for input of length {}", input.len());
    }
}

#[test]
fn round_trips_a_short_alternating_pattern() {
    let input = b"ABABABABAB";
    let packed = compress(input);
    assert_eq!(decompress(&packed, RefpackConfig::default()).unwrap(), input);
}

#[test]
fn compressed_stream_carries_a_recognizable_header() {
    let packed = compress(b"some reasonably long piece of text to compress");
    assert!(has_refpack_header(&packed));
    assert!(!has_refpack_header(b"not a refpack stream at all"));
}

#[test]
fn highly_repetitive_input_compresses_smaller_than_source() {
    let input = vec![b'z'; 10_000];
    let packed = compress(&input);
    assert!(packed.len() < input.len() / 10);
}

#[test]
fn corrupt_stream_is_rejected_rather_than_panicking() {
    let mut packed = compress(b"some data with enough length to produce back-references here");
    // Truncate mid-stream; decode must fail cleanly, never panic or read OOB.
    packed.truncate(packed.len() - 2);
    assert!(decompress(&packed, RefpackConfig::default()).is_err());
}

#[test]
fn ignore_mismatch_logs_and_returns_bytes_instead_of_erroring() {
    init_logging();
    let mut stream = compress(b"hello");
    // Corrupt the declared size byte so it disagrees with the real output.
    stream[2] = stream[2].wrapping_add(1);

    assert!(decompress(&stream, RefpackConfig::default()).is_err());
    assert_eq!(
        decompress(&stream, RefpackConfig { ignore_mismatch: true }).unwrap(),
        b"hello"
    );
}
