//! Shared fixtures for the integration suites.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use kanzi::entropy::EntropyType;
use kanzi::hash::ChecksumKind;
use kanzi::stream::compress::{CompressConfig, CompressedOutputStream};
use kanzi::stream::decompress::{CompressedInputStream, DecompressConfig};
use kanzi::transform::TransformChain;

/// Growable sink that stays readable after the stream consumed the writer.
#[derive(Clone, Default)]
pub struct SharedVec(Arc<Mutex<Vec<u8>>>);

impl SharedVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.lock().unwrap())
    }
}

impl Write for SharedVec {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One-stop stream compression of a byte slice.
pub fn compress(
    data: &[u8],
    transforms: &str,
    entropy: EntropyType,
    block_size: usize,
    checksum: ChecksumKind,
    jobs: usize,
) -> Vec<u8> {
    let sink = SharedVec::new();
    let mut cos = CompressedOutputStream::new(
        sink.clone(),
        CompressConfig {
            entropy,
            transforms: TransformChain::from_names(transforms).unwrap(),
            block_size,
            checksum,
            jobs,
            headerless: false,
            original_size: Some(data.len() as u64),
        },
    )
    .unwrap();
    cos.write_all(data).unwrap();
    cos.close().unwrap();
    sink.take()
}

/// One-stop stream decompression.
pub fn decompress(bytes: &[u8], jobs: usize) -> Vec<u8> {
    let mut cis = CompressedInputStream::new(
        std::io::Cursor::new(bytes.to_vec()),
        DecompressConfig { jobs, ..DecompressConfig::default() },
    )
    .unwrap();
    let mut out = Vec::new();
    cis.read_to_end(&mut out).unwrap();
    out
}

/// Deterministic xorshift byte generator for reproducible fixtures.
pub fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut x = seed | 1;
    for _ in 0..len {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        out.push((x >> 32) as u8);
    }
    out
}
