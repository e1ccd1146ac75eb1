//! Criterion benches for the block pipeline: per-codec throughput over a
//! mixed corpus block.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kanzi::entropy::EntropyType;
use kanzi::hash::ChecksumKind;
use kanzi::stream::compress::{CompressConfig, CompressedOutputStream};
use kanzi::stream::decompress::{CompressedInputStream, DecompressConfig};
use kanzi::transform::TransformChain;

#[derive(Clone, Default)]
struct SharedVec(Arc<Mutex<Vec<u8>>>);

impl Write for SharedVec {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn corpus(len: usize) -> Vec<u8> {
    let words: &[&[u8]] = &[b"block", b"stream", b"entropy", b"transform", b" ", b"0123"];
    let mut out = Vec::with_capacity(len);
    let mut x = 0x6C07_8965_44B3_21C7u64;
    while out.len() < len {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        out.extend_from_slice(words[(x % words.len() as u64) as usize]);
    }
    out.truncate(len);
    out
}

fn pack(data: &[u8], chain: &str, entropy: EntropyType) -> Vec<u8> {
    let sink = SharedVec::default();
    let mut cos = CompressedOutputStream::new(
        sink.clone(),
        CompressConfig {
            entropy,
            transforms: TransformChain::from_names(chain).unwrap(),
            block_size: 262_144,
            checksum: ChecksumKind::None,
            jobs: 1,
            headerless: false,
            original_size: Some(data.len() as u64),
        },
    )
    .unwrap();
    cos.write_all(data).unwrap();
    cos.close().unwrap();
    let out = sink.0.lock().unwrap().clone();
    out
}

fn bench_compress(c: &mut Criterion) {
    let data = corpus(1 << 20);
    let mut group = c.benchmark_group("compress");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for (chain, entropy) in [
        ("LZ", EntropyType::Huffman),
        ("LZX", EntropyType::Ans0),
        ("BWT+MTFT+ZRLT", EntropyType::Ans0),
    ] {
        group.bench_with_input(
            BenchmarkId::new(chain, entropy.name()),
            &data,
            |b, data| b.iter(|| pack(data, chain, entropy)),
        );
    }
    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let data = corpus(1 << 20);
    let packed = pack(&data, "LZ", EntropyType::Huffman);
    let mut group = c.benchmark_group("decompress");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("LZ/HUFFMAN", |b| {
        b.iter(|| {
            let mut cis = CompressedInputStream::new(
                std::io::Cursor::new(packed.clone()),
                DecompressConfig::default(),
            )
            .unwrap();
            let mut out = Vec::with_capacity(data.len());
            cis.read_to_end(&mut out).unwrap();
            out
        })
    });
    group.finish();
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
