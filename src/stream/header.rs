//! File-level stream header.
//!
//! Current streams are written with version 6; versions 3 to 5 are read-only
//! legacy layouts differing in checksum-flag width, header CRC width, and
//! padding. The layout is bit-packed, most significant bit first:
//!
//! ```text
//! magic "KANZ"        32
//! version              4
//! checksum kind        2   (1 bit before version 4)
//! entropy codec id     5
//! transform chain id  48
//! block size / 16     28
//! size mask m          2
//! original size    16*m
//! padding             15   (version 6 only, reserved, zero on write)
//! header CRC       16/24   (version 5 / 6; absent before 5)
//! ```

use std::io::{Read, Write};

use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::entropy::EntropyType;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::ChecksumKind;
use crate::transform::TransformChain;

use super::check_block_size;

/// "KANZ".
pub const BITSTREAM_MAGIC: u32 = 0x4B41_4E5A;
/// Version written by this implementation.
pub const BITSTREAM_VERSION: u32 = 6;
/// Oldest version this implementation still reads.
pub const MIN_BITSTREAM_VERSION: u32 = 3;

const HEADER_HASH: u32 = 0x1E35_A7BD;

/// Decoded stream-level parameters.
#[derive(Debug, Clone)]
pub struct StreamParams {
    pub version: u32,
    pub checksum: ChecksumKind,
    pub entropy: EntropyType,
    pub transforms: TransformChain,
    pub block_size: usize,
    /// Total original byte count when known.
    pub original_size: Option<u64>,
}

impl Default for StreamParams {
    fn default() -> Self {
        StreamParams {
            version: BITSTREAM_VERSION,
            checksum: ChecksumKind::None,
            entropy: EntropyType::None,
            transforms: TransformChain::default(),
            block_size: 4 * 1024 * 1024,
            original_size: None,
        }
    }
}

/// Folded multiplicative checksum over the header fields.
///
/// Seeded by the version; each field enters negated so a zero field still
/// perturbs the state. The final fold spreads high bits down before
/// truncation to the stored width.
fn header_checksum(
    version: u32,
    checksum_id: u32,
    entropy_id: u32,
    chain_id: u64,
    block_size: u32,
    size_mask: u32,
    original_size: u64,
) -> u32 {
    let seed = 0x0103_0507u32.wrapping_mul(version);
    let mut x = HEADER_HASH.wrapping_mul(seed);
    x ^= HEADER_HASH.wrapping_mul(!checksum_id);
    x ^= HEADER_HASH.wrapping_mul(!entropy_id);
    x ^= HEADER_HASH.wrapping_mul(!(chain_id as u32));
    x ^= HEADER_HASH.wrapping_mul(!((chain_id >> 32) as u32));
    x ^= HEADER_HASH.wrapping_mul(!block_size);
    x ^= HEADER_HASH.wrapping_mul(!size_mask);
    if size_mask > 0 {
        x ^= HEADER_HASH.wrapping_mul(!(original_size as u32));
        x ^= HEADER_HASH.wrapping_mul(!((original_size >> 32) as u32));
    }
    ((x >> 23) ^ (x >> 3)) & 0x00FF_FFFF
}

/// Number of 16-bit groups needed for the original-size field.
fn size_mask_for(original_size: Option<u64>) -> (u32, u64) {
    match original_size {
        None => (0, 0),
        Some(sz) => {
            if sz < 1 << 16 {
                (1, sz)
            } else if sz < 1 << 32 {
                (2, sz)
            } else if sz < 1 << 48 {
                (3, sz)
            } else {
                // Too wide to store; the reader falls back to "unknown".
                (0, 0)
            }
        }
    }
}

/// Writes a version-6 header.
pub fn write_header<W: Write>(obs: &mut OutputBitStream<W>, params: &StreamParams) -> Result<()> {
    check_block_size(params.block_size)?;
    let (mask, size) = size_mask_for(params.original_size);
    let chain_id = params.transforms.id();

    let mut put = |v: u64, bits: u32| -> Result<()> {
        obs.write_bits(v, bits)
            .map_err(|e| Error::new(ErrorKind::WriteFile, e.to_string()))
    };

    put(BITSTREAM_MAGIC as u64, 32)?;
    put(BITSTREAM_VERSION as u64, 4)?;
    put(params.checksum.id() as u64, 2)?;
    put(params.entropy.id() as u64, 5)?;
    put(chain_id, 48)?;
    put((params.block_size / 16) as u64, 28)?;
    put(mask as u64, 2)?;
    if mask > 0 {
        put(size, 16 * mask)?;
    }
    put(0, 15)?; // reserved
    let crc = header_checksum(
        BITSTREAM_VERSION,
        params.checksum.id(),
        params.entropy.id(),
        chain_id,
        params.block_size as u32,
        mask,
        size,
    );
    put(crc as u64, 24)?;
    Ok(())
}

/// Reads and validates a stream header of any supported version.
pub fn read_header<R: Read>(ibs: &mut InputBitStream<R>) -> Result<StreamParams> {
    let mut get = |bits: u32| -> Result<u64> {
        ibs.read_bits(bits)
            .map_err(|e| Error::new(ErrorKind::InvalidFile, format!("truncated header: {e}")))
    };

    let magic = get(32)? as u32;
    if magic != BITSTREAM_MAGIC {
        return Err(Error::new(ErrorKind::InvalidFile, "invalid magic number"));
    }
    let version = get(4)? as u32;
    if version > BITSTREAM_VERSION || version < MIN_BITSTREAM_VERSION {
        return Err(Error::new(
            ErrorKind::StreamVersion,
            format!("stream version {version} unsupported"),
        ));
    }

    // The checksum field widened to 2 bits in version 4; version 3 stored a
    // single present/absent flag (1 = 32-bit).
    let checksum_id = if version >= 4 { get(2)? as u32 } else { get(1)? as u32 };
    let checksum = ChecksumKind::from_id(checksum_id)
        .ok_or_else(|| Error::new(ErrorKind::InvalidFile, "reserved checksum kind"))?;

    let entropy_id = get(5)? as u32;
    let entropy = EntropyType::from_id(entropy_id).ok_or_else(|| {
        Error::new(ErrorKind::InvalidCodec, format!("unknown entropy codec id {entropy_id}"))
    })?;

    let chain_id = get(48)?;
    let transforms = TransformChain::from_id(chain_id)?;

    let block_size = get(28)? as usize * 16;
    check_block_size(block_size)?;

    let mask = get(2)? as u32;
    let size = if mask > 0 { get(16 * mask)? } else { 0 };
    let original_size = if mask > 0 { Some(size) } else { None };

    if version >= 6 {
        let _reserved = get(15)?;
        let stored = get(24)? as u32;
        let computed = header_checksum(
            version,
            checksum_id,
            entropy_id,
            chain_id,
            block_size as u32,
            mask,
            size,
        );
        if stored != computed {
            return Err(Error::new(ErrorKind::CrcCheck, "header checksum mismatch"));
        }
    } else if version == 5 {
        let stored = get(16)? as u32;
        let computed = header_checksum(
            version,
            checksum_id,
            entropy_id,
            chain_id,
            block_size as u32,
            mask,
            size,
        ) & 0xFFFF;
        if stored != computed {
            return Err(Error::new(ErrorKind::CrcCheck, "header checksum mismatch"));
        }
    }

    Ok(StreamParams { version, checksum, entropy, transforms, block_size, original_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_params() -> StreamParams {
        StreamParams {
            version: BITSTREAM_VERSION,
            checksum: ChecksumKind::Xxh32,
            entropy: EntropyType::Huffman,
            transforms: TransformChain::from_names("BWT+MTFT+ZRLT").unwrap(),
            block_size: 1 << 20,
            original_size: Some(123_456_789),
        }
    }

    fn encode(params: &StreamParams) -> Vec<u8> {
        let mut obs = OutputBitStream::new(Vec::new());
        write_header(&mut obs, params).unwrap();
        obs.close().unwrap();
        obs.into_inner()
    }

    #[test]
    fn roundtrip_all_fields() {
        let params = sample_params();
        let bytes = encode(&params);
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let back = read_header(&mut ibs).unwrap();
        assert_eq!(back.version, BITSTREAM_VERSION);
        assert_eq!(back.checksum, params.checksum);
        assert_eq!(back.entropy, params.entropy);
        assert_eq!(back.transforms, params.transforms);
        assert_eq!(back.block_size, params.block_size);
        assert_eq!(back.original_size, params.original_size);
    }

    #[test]
    fn roundtrip_without_size() {
        let mut params = sample_params();
        params.original_size = None;
        params.checksum = ChecksumKind::None;
        let bytes = encode(&params);
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let back = read_header(&mut ibs).unwrap();
        assert_eq!(back.original_size, None);
        assert_eq!(back.checksum, ChecksumKind::None);
    }

    #[test]
    fn bad_magic_is_invalid_file() {
        let mut bytes = encode(&sample_params());
        bytes[0] ^= 0x01;
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let err = read_header(&mut ibs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFile);
    }

    #[test]
    fn any_header_bit_flip_is_caught() {
        let mut params = sample_params();
        params.original_size = None;
        let reference = encode(&params);
        // Flip every bit of every field ahead of the CRC and expect an error
        // each time.
        let field_bits = 32 + 4 + 2 + 5 + 48 + 28 + 2;
        for bit in 0..field_bits {
            let mut bytes = reference.clone();
            bytes[bit / 8] ^= 0x80 >> (bit % 8);
            let mut ibs = InputBitStream::new(Cursor::new(bytes));
            assert!(read_header(&mut ibs).is_err(), "bit {bit} flip not caught");
        }
    }

    #[test]
    fn future_version_is_rejected() {
        let mut bytes = encode(&sample_params());
        // Version field: bits 32..36. Set to 7.
        bytes[4] = (bytes[4] & 0x0F) | 0x70;
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let err = read_header(&mut ibs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamVersion);
    }

    /// Builds a legacy header by hand: shared prefix, then the per-version
    /// tail (16-bit CRC for version 5, nothing for 4 and 3).
    fn encode_legacy(version: u32, checksum_id: u32, block_size: usize) -> Vec<u8> {
        let entropy_id = EntropyType::Huffman.id();
        let chain_id = TransformChain::from_names("LZ").unwrap().id();
        let mut obs = OutputBitStream::new(Vec::new());
        obs.write_bits(BITSTREAM_MAGIC as u64, 32).unwrap();
        obs.write_bits(version as u64, 4).unwrap();
        let ck_bits = if version >= 4 { 2 } else { 1 };
        obs.write_bits(checksum_id as u64, ck_bits).unwrap();
        obs.write_bits(entropy_id as u64, 5).unwrap();
        obs.write_bits(chain_id, 48).unwrap();
        obs.write_bits((block_size / 16) as u64, 28).unwrap();
        obs.write_bits(0, 2).unwrap(); // no size field
        if version == 5 {
            let crc = header_checksum(
                version,
                checksum_id,
                entropy_id,
                chain_id,
                block_size as u32,
                0,
                0,
            ) & 0xFFFF;
            obs.write_bits(crc as u64, 16).unwrap();
        }
        obs.close().unwrap();
        obs.into_inner()
    }

    #[test]
    fn version5_header_decodes_with_short_crc() {
        let bytes = encode_legacy(5, ChecksumKind::Xxh64.id(), 1 << 16);
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let back = read_header(&mut ibs).unwrap();
        assert_eq!(back.version, 5);
        assert_eq!(back.checksum, ChecksumKind::Xxh64);
        assert_eq!(back.entropy, EntropyType::Huffman);
        assert_eq!(back.transforms.names(), "LZ");
        assert_eq!(back.block_size, 1 << 16);
        assert_eq!(back.original_size, None);

        // A flipped checksum-kind bit (2 -> reserved 3) must be rejected.
        let mut bytes = encode_legacy(5, ChecksumKind::Xxh64.id(), 1 << 16);
        bytes[4] ^= 0x04; // bit 37, low checksum-kind bit
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        assert!(read_header(&mut ibs).is_err());
    }

    #[test]
    fn version4_header_keeps_two_bit_checksum_field() {
        // Kind 2 (64-bit) only encodes in a 2-bit field; decoding it proves
        // version 4 is not narrowed to the version-3 flag.
        let bytes = encode_legacy(4, ChecksumKind::Xxh64.id(), 4096);
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let back = read_header(&mut ibs).unwrap();
        assert_eq!(back.version, 4);
        assert_eq!(back.checksum, ChecksumKind::Xxh64);
        assert_eq!(back.entropy, EntropyType::Huffman);
        assert_eq!(back.block_size, 4096);
    }

    #[test]
    fn version3_header_reads_single_checksum_flag() {
        let bytes = encode_legacy(3, 1, 4096);
        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let back = read_header(&mut ibs).unwrap();
        assert_eq!(back.version, 3);
        assert_eq!(back.checksum, ChecksumKind::Xxh32);
        assert_eq!(back.block_size, 4096);
    }

    #[test]
    fn oversized_total_drops_the_field() {
        let (mask, _) = size_mask_for(Some(u64::MAX));
        assert_eq!(mask, 0);
        let (mask, sz) = size_mask_for(Some(65_535));
        assert_eq!((mask, sz), (1, 65_535));
        let (mask, _) = size_mask_for(Some(1 << 40));
        assert_eq!(mask, 3);
    }
}
