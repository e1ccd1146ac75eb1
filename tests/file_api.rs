//! File front-end behaviour: overwrite policy, extension mapping, directory
//! expansion, and input removal.

use std::fs;

use kanzi::config::{Config, NONE_MARK};
use kanzi::entropy::EntropyType;
use kanzi::error::ErrorKind;
use kanzi::hash::ChecksumKind;
use kanzi::io::{compress_file, decompress_file};
use kanzi::transform::TransformChain;
use tempfile::TempDir;

fn base_config() -> Config {
    Config {
        transform_chain: TransformChain::from_names("LZ").unwrap(),
        entropy_codec: EntropyType::Huffman,
        block_size: 4096,
        checksum: ChecksumKind::Xxh32,
        verbosity: 0,
        ..Config::default()
    }
}

#[test]
fn file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    let packed = dir.path().join("data.bin.knz");
    let restored = dir.path().join("restored.bin");
    let payload = b"file based round trip payload ".repeat(500);
    fs::write(&input, &payload).unwrap();

    let mut cfg = base_config();
    cfg.input_name = input.to_string_lossy().into_owned();
    cfg.output_name = packed.to_string_lossy().into_owned();
    let (read, written) = compress_file(&cfg).unwrap();
    assert_eq!(read, payload.len() as u64);
    assert!(written > 0);

    let mut dcfg = base_config();
    dcfg.input_name = packed.to_string_lossy().into_owned();
    dcfg.output_name = restored.to_string_lossy().into_owned();
    decompress_file(&dcfg).unwrap();
    assert_eq!(fs::read(&restored).unwrap(), payload);
}

#[test]
fn existing_output_requires_overwrite() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.bin");
    let output = dir.path().join("out.knz");
    fs::write(&input, b"payload").unwrap();
    fs::write(&output, b"already here").unwrap();

    let mut cfg = base_config();
    cfg.input_name = input.to_string_lossy().into_owned();
    cfg.output_name = output.to_string_lossy().into_owned();
    let err = compress_file(&cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OverwriteFile);

    cfg.overwrite = true;
    compress_file(&cfg).unwrap();
}

#[test]
fn output_directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.bin");
    fs::write(&input, b"payload").unwrap();

    let mut cfg = base_config();
    cfg.input_name = input.to_string_lossy().into_owned();
    cfg.output_name = dir.path().to_string_lossy().into_owned();
    let err = compress_file(&cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputIsDir);
}

#[test]
fn missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut cfg = base_config();
    cfg.input_name = dir.path().join("absent.bin").to_string_lossy().into_owned();
    cfg.output_name = NONE_MARK.to_owned();
    let err = compress_file(&cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OpenFile);
}

#[test]
fn remove_input_deletes_source_after_success() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.bin");
    fs::write(&input, b"going away").unwrap();

    let mut cfg = base_config();
    cfg.input_name = input.to_string_lossy().into_owned();
    cfg.output_name = dir.path().join("out.knz").to_string_lossy().into_owned();
    cfg.remove_input = true;
    compress_file(&cfg).unwrap();
    assert!(!input.exists());
}

#[test]
fn none_output_discards_but_reports_sizes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.bin");
    fs::write(&input, vec![7u8; 10_000]).unwrap();

    let mut cfg = base_config();
    cfg.input_name = input.to_string_lossy().into_owned();
    cfg.output_name = NONE_MARK.to_owned();
    let (read, written) = compress_file(&cfg).unwrap();
    assert_eq!(read, 10_000);
    assert!(written > 0 && written < 10_000);
}

#[test]
fn corrupted_file_surfaces_crc_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.bin");
    let packed = dir.path().join("in.bin.knz");
    fs::write(&input, b"x".repeat(5_000)).unwrap();

    let mut cfg = base_config();
    cfg.checksum = ChecksumKind::Xxh64;
    cfg.input_name = input.to_string_lossy().into_owned();
    cfg.output_name = packed.to_string_lossy().into_owned();
    compress_file(&cfg).unwrap();

    let mut bytes = fs::read(&packed).unwrap();
    let n = bytes.len();
    bytes[n / 2] ^= 0x40;
    fs::write(&packed, &bytes).unwrap();

    let mut dcfg = base_config();
    dcfg.input_name = packed.to_string_lossy().into_owned();
    dcfg.output_name = NONE_MARK.to_owned();
    let err = decompress_file(&dcfg).unwrap_err();
    assert!(
        matches!(
            err.kind(),
            ErrorKind::CrcCheck
                | ErrorKind::ProcessBlock
                | ErrorKind::ReadFile
                | ErrorKind::BlockSize
        ),
        "unexpected kind {:?}",
        err.kind()
    );
}
