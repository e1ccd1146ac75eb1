//! End-to-end round-trip coverage of the compressed stream pair:
//! configuration matrix, the reference scenarios, and framing overheads.

mod common;

use std::io::Read;

use common::{compress, decompress, pseudo_random};
use kanzi::entropy::EntropyType;
use kanzi::hash::ChecksumKind;
use kanzi::stream::decompress::{CompressedInputStream, DecompressConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Reference scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn mississippi_huffman_fits_expected_envelope() {
    let data = b"mississippi";
    let bytes = compress(data, "NONE", EntropyType::Huffman, 1024, ChecksumKind::None, 1);
    assert!(
        (45..=70).contains(&bytes.len()),
        "stream length {} outside 45..=70",
        bytes.len()
    );
    assert_eq!(decompress(&bytes, 1), data);
}

#[test]
fn constant_block_fpaq_with_checksum() {
    let data = vec![0x02u8; 40];
    let bytes = compress(&data, "NONE", EntropyType::Fpaq, 1024, ChecksumKind::Xxh32, 1);
    // Stream header (24 bytes) plus a payload that cannot shrink below the
    // coder flush.
    assert!(bytes.len() >= 24 + 8);
    assert_eq!(decompress(&bytes, 1), data);
}

#[test]
fn periodic_bwt_chain_compresses_below_two_percent() {
    let data: Vec<u8> = (0u8..=255).cycle().take(512 * 1024).collect();
    let bytes = compress(
        &data,
        "BWT+MTFT+ZRLT",
        EntropyType::Ans0,
        65_536,
        ChecksumKind::None,
        2,
    );
    assert!(
        bytes.len() < data.len() / 50,
        "compressed {} bytes, expected < 2% of {}",
        bytes.len(),
        data.len()
    );
    assert_eq!(decompress(&bytes, 2), data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration matrix
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn codec_matrix_roundtrips() {
    let inputs: Vec<Vec<u8>> = vec![
        b"to be or not to be, that is the question ".repeat(50),
        pseudo_random(10_000, 0xDEAD_BEEF),
        vec![0u8; 5_000],
        (0u8..=255).cycle().take(3_000).collect(),
    ];
    let configs: &[(&str, EntropyType)] = &[
        ("NONE", EntropyType::None),
        ("NONE", EntropyType::Range),
        ("LZ", EntropyType::Huffman),
        ("LZX", EntropyType::Ans0),
        ("ROLZ", EntropyType::ExpGolomb),
        ("RLT+ZRLT", EntropyType::Ans1),
        ("BWT+MTFT+ZRLT", EntropyType::Cm),
        ("BWT+SRT+ZRLT", EntropyType::Fpaq),
        ("FSD+LZ", EntropyType::Tpaq),
    ];
    for (chain, entropy) in configs {
        for data in &inputs {
            for checksum in [ChecksumKind::None, ChecksumKind::Xxh32, ChecksumKind::Xxh64] {
                let bytes = compress(data, chain, *entropy, 16_384, checksum, 1);
                assert_eq!(
                    &decompress(&bytes, 1),
                    data,
                    "chain {chain} entropy {} checksum {checksum:?}",
                    entropy.name()
                );
            }
        }
    }
}

#[test]
fn empty_input_roundtrips() {
    let bytes = compress(b"", "LZ", EntropyType::Huffman, 1024, ChecksumKind::Xxh32, 1);
    assert_eq!(decompress(&bytes, 1), b"");
    // Header plus a terminal frame only.
    assert!(bytes.len() <= 32, "empty stream unexpectedly large: {}", bytes.len());
}

#[test]
fn one_byte_input_roundtrips() {
    for entropy in [EntropyType::Huffman, EntropyType::Fpaq, EntropyType::Ans0] {
        let bytes = compress(b"K", "NONE", entropy, 1024, ChecksumKind::Xxh64, 1);
        assert_eq!(decompress(&bytes, 1), b"K");
    }
}

#[test]
fn block_boundary_sizes_roundtrip() {
    let block = 1024usize;
    for len in [block - 1, block, block + 1, 3 * block, 4 * block - 7] {
        let data = pseudo_random(len, len as u64);
        let bytes = compress(&data, "LZ", EntropyType::Range, block, ChecksumKind::Xxh32, 2);
        assert_eq!(decompress(&bytes, 2), data, "length {len}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Framing overhead
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn refused_transforms_cost_at_most_32_bytes_per_block() {
    // Random data refuses every compressive transform; with entropy NONE the
    // block must stay within the documented overhead.
    let data = pseudo_random(1_000, 42);
    let bytes = compress(&data, "RLT+ZRLT", EntropyType::None, 1024, ChecksumKind::None, 1);
    let stream_header = 24;
    assert!(
        bytes.len() <= stream_header + data.len() + 32,
        "expanded to {} bytes",
        bytes.len()
    );
    assert_eq!(decompress(&bytes, 1), data);
}

#[test]
fn block_range_decodes_selected_blocks_only() {
    let block = 1024usize;
    let data = pseudo_random(4 * block, 7);
    let bytes = compress(&data, "NONE", EntropyType::Huffman, block, ChecksumKind::None, 1);

    let mut cis = CompressedInputStream::new(
        std::io::Cursor::new(bytes),
        DecompressConfig { jobs: 1, from_block: 2, to_block: 4, ..DecompressConfig::default() },
    )
    .unwrap();
    let mut out = Vec::new();
    cis.read_to_end(&mut out).unwrap();
    assert_eq!(out, &data[block..3 * block]);
}
