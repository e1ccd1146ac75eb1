//! Entropy codecs operating on byte blocks over a bitstream.
//!
//! Codecs are addressed by a 5-bit identifier stored in the stream header and
//! dispatched through tagged variants rather than trait objects; all per-block
//! state lives inside a single `encode`/`decode` call, so disposal is simply
//! the end of the call.

mod ans;
mod binary;
mod cm;
mod exp_golomb;
mod fpaq;
mod huffman;
mod range;
mod tpaq;

use std::io::{Read, Write};

use crate::bitstream::{BitStreamError, InputBitStream, OutputBitStream};
use crate::error::{Error, ErrorKind, Result};

/// Entropy codec identifiers (5-bit field in the stream header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntropyType {
    #[default]
    None,
    Huffman,
    Fpaq,
    Range,
    Ans0,
    Ans1,
    Cm,
    Tpaq,
    ExpGolomb,
}

impl EntropyType {
    /// 5-bit identifier written to the stream header.
    pub fn id(self) -> u32 {
        match self {
            EntropyType::None => 0,
            EntropyType::Huffman => 1,
            EntropyType::Fpaq => 2,
            EntropyType::Range => 3,
            EntropyType::Ans0 => 4,
            EntropyType::Ans1 => 5,
            EntropyType::Cm => 6,
            EntropyType::Tpaq => 7,
            EntropyType::ExpGolomb => 8,
        }
    }

    /// Decodes the 5-bit header field.
    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => EntropyType::None,
            1 => EntropyType::Huffman,
            2 => EntropyType::Fpaq,
            3 => EntropyType::Range,
            4 => EntropyType::Ans0,
            5 => EntropyType::Ans1,
            6 => EntropyType::Cm,
            7 => EntropyType::Tpaq,
            8 => EntropyType::ExpGolomb,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            EntropyType::None => "NONE",
            EntropyType::Huffman => "HUFFMAN",
            EntropyType::Fpaq => "FPAQ",
            EntropyType::Range => "RANGE",
            EntropyType::Ans0 => "ANS0",
            EntropyType::Ans1 => "ANS1",
            EntropyType::Cm => "CM",
            EntropyType::Tpaq => "TPAQ",
            EntropyType::ExpGolomb => "EXPGOLOMB",
        }
    }

    /// Parses a codec name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Some(match upper.as_str() {
            "NONE" => EntropyType::None,
            "HUFFMAN" => EntropyType::Huffman,
            "FPAQ" => EntropyType::Fpaq,
            "RANGE" => EntropyType::Range,
            "ANS0" => EntropyType::Ans0,
            "ANS1" => EntropyType::Ans1,
            "CM" => EntropyType::Cm,
            "TPAQ" => EntropyType::Tpaq,
            "EXPGOLOMB" => EntropyType::ExpGolomb,
            _ => return None,
        })
    }

    /// Encodes `src` into `obs`. Returns the number of source bytes consumed.
    pub fn encode<W: Write>(
        self,
        obs: &mut OutputBitStream<W>,
        src: &[u8],
    ) -> Result<usize> {
        match self {
            EntropyType::None => {
                obs.write_bits_from(src, src.len() * 8).map_err(write_err)?;
                Ok(src.len())
            }
            EntropyType::Huffman => huffman::encode(obs, src),
            EntropyType::Fpaq => fpaq::encode(obs, src),
            EntropyType::Range => range::encode(obs, src),
            EntropyType::Ans0 => ans::encode_order0(obs, src),
            EntropyType::Ans1 => ans::encode_order1(obs, src),
            EntropyType::Cm => cm::encode(obs, src),
            EntropyType::Tpaq => tpaq::encode(obs, src),
            EntropyType::ExpGolomb => exp_golomb::encode(obs, src),
        }
    }

    /// Decodes exactly `dst.len()` bytes from `ibs` into `dst`.
    pub fn decode<R: Read>(
        self,
        ibs: &mut InputBitStream<R>,
        dst: &mut [u8],
    ) -> Result<usize> {
        match self {
            EntropyType::None => {
                ibs.read_bits_into(dst, dst.len() * 8).map_err(read_err)?;
                Ok(dst.len())
            }
            EntropyType::Huffman => huffman::decode(ibs, dst),
            EntropyType::Fpaq => fpaq::decode(ibs, dst),
            EntropyType::Range => range::decode(ibs, dst),
            EntropyType::Ans0 => ans::decode_order0(ibs, dst),
            EntropyType::Ans1 => ans::decode_order1(ibs, dst),
            EntropyType::Cm => cm::decode(ibs, dst),
            EntropyType::Tpaq => tpaq::decode(ibs, dst),
            EntropyType::ExpGolomb => exp_golomb::decode(ibs, dst),
        }
    }
}

/// Maps a bitstream failure on the encode side.
pub(crate) fn write_err(e: BitStreamError) -> Error {
    Error::new(ErrorKind::WriteFile, e.to_string())
}

/// Maps a bitstream failure on the decode side; EOF inside a payload is an
/// `ERR_READ_FILE` per the stream contract.
pub(crate) fn read_err(e: BitStreamError) -> Error {
    Error::new(ErrorKind::ReadFile, e.to_string())
}

/// Signals malformed codec data discovered during decode.
pub(crate) fn data_err(msg: &str) -> Error {
    Error::new(ErrorKind::ProcessBlock, msg)
}

// ── Shared primitives: Exp-Golomb values and frequency tables ───────────────

/// Writes `v` as an order-0 Exp-Golomb code: `bitlen(v+1) - 1` zeros, then
/// `v + 1` in as many bits.
pub(crate) fn write_eg<W: Write>(obs: &mut OutputBitStream<W>, v: u32) -> Result<()> {
    let m = v as u64 + 1;
    let n = 64 - m.leading_zeros();
    if n > 1 {
        obs.write_bits(0, n - 1).map_err(write_err)?;
    }
    obs.write_bits(m, n).map_err(write_err)
}

/// Reads an order-0 Exp-Golomb coded value.
pub(crate) fn read_eg<R: Read>(ibs: &mut InputBitStream<R>) -> Result<u32> {
    let mut zeros = 0u32;
    while !ibs.read_bit().map_err(read_err)? {
        zeros += 1;
        if zeros > 31 {
            return Err(data_err("exp-golomb prefix too long"));
        }
    }
    let mut m = 1u64;
    if zeros > 0 {
        m = (m << zeros) | ibs.read_bits(zeros).map_err(read_err)?;
    }
    Ok((m - 1) as u32)
}

/// Scales a raw histogram to sum exactly to `target`, keeping every present
/// symbol at frequency >= 1. Returns `None` for an empty histogram.
pub(crate) fn normalize_freqs(freqs: &[u32; 256], target: u32) -> Option<[u32; 256]> {
    let total: u64 = freqs.iter().map(|&f| f as u64).sum();
    if total == 0 {
        return None;
    }
    let mut scaled = [0u32; 256];
    let mut sum = 0u64;
    for s in 0..256 {
        if freqs[s] > 0 {
            let f = ((freqs[s] as u64 * target as u64) / total).max(1) as u32;
            scaled[s] = f;
            sum += f as u64;
        }
    }
    // Push the drift onto the most frequent symbols.
    while sum != target as u64 {
        if sum < target as u64 {
            let s = (0..256).max_by_key(|&s| scaled[s]).unwrap();
            let add = (target as u64 - sum).min(target as u64) as u32;
            scaled[s] += add;
            sum += add as u64;
        } else {
            // Shave from the largest entries, never below 1.
            let s = (0..256).max_by_key(|&s| scaled[s]).unwrap();
            if scaled[s] <= 1 {
                break;
            }
            let cut = (sum - target as u64).min((scaled[s] - 1) as u64) as u32;
            scaled[s] -= cut;
            sum -= cut as u64;
        }
    }
    Some(scaled)
}

/// Writes a normalized 256-entry frequency table, one Exp-Golomb value per
/// symbol (absent symbols cost a single bit).
pub(crate) fn write_freq_table<W: Write>(
    obs: &mut OutputBitStream<W>,
    freqs: &[u32; 256],
) -> Result<()> {
    for s in 0..256 {
        write_eg(obs, freqs[s])?;
    }
    Ok(())
}

/// Reads a frequency table written by [`write_freq_table`] and checks it sums
/// to `expected_total`.
pub(crate) fn read_freq_table<R: Read>(
    ibs: &mut InputBitStream<R>,
    expected_total: u32,
) -> Result<[u32; 256]> {
    let mut freqs = [0u32; 256];
    let mut sum = 0u64;
    for s in 0..256 {
        freqs[s] = read_eg(ibs)?;
        sum += freqs[s] as u64;
    }
    if sum != expected_total as u64 {
        return Err(data_err("corrupt frequency table"));
    }
    Ok(freqs)
}

/// Cumulative table: `cum[s]` is the sum of frequencies below symbol `s`.
pub(crate) fn cumulative(freqs: &[u32; 256]) -> [u32; 257] {
    let mut cum = [0u32; 257];
    for s in 0..256 {
        cum[s + 1] = cum[s] + freqs[s];
    }
    cum
}
