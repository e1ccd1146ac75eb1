//! Kanzi — modular, multithreaded, lossless block compressor.
//!
//! A single input stream is partitioned into fixed-size blocks; each block
//! runs through a configurable chain of byte [transforms](transform) followed
//! by an [entropy codec](entropy), with optional XXHash block checksums.
//! Blocks are processed concurrently but framed strictly in order inside one
//! shared big-endian [bitstream]. The container format is self-describing
//! ("KANZ" stream header) unless headerless mode is requested.
//!
//! Typical use goes through the stream pair:
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use kanzi::stream::compress::CompressConfig;
//! use kanzi::stream::decompress::DecompressConfig;
//! use kanzi::stream::{CompressedInputStream, CompressedOutputStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = std::fs::File::create("data.knz")?;
//! let mut cos = CompressedOutputStream::new(sink, CompressConfig {
//!     entropy: kanzi::entropy::EntropyType::Huffman,
//!     transforms: kanzi::transform::TransformChain::from_names("LZ")?,
//!     ..CompressConfig::default()
//! })?;
//! cos.write_all(b"some bytes")?;
//! cos.close()?;
//!
//! let src = std::fs::File::open("data.knz")?;
//! let mut cis = CompressedInputStream::new(src, DecompressConfig::default())?;
//! let mut back = Vec::new();
//! cis.read_to_end(&mut back)?;
//! # Ok(())
//! # }
//! ```

pub mod bitstream;
pub mod cli;
pub mod config;
pub mod entropy;
pub mod error;
pub mod event;
pub mod hash;
pub mod io;
pub mod logging;
pub mod stream;
pub mod transform;

pub use error::{Error, ErrorKind};
pub use stream::{CompressedInputStream, CompressedOutputStream};

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
