//! Order-0 Exp-Golomb codec.
//!
//! Each byte is coded as the universal code of its value. Useful for blocks
//! dominated by small values, typically after a delta or residue transform.

use std::io::{Read, Write};

use super::{read_eg, write_eg};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

pub(crate) fn encode<W: Write>(obs: &mut OutputBitStream<W>, src: &[u8]) -> Result<usize> {
    for &b in src {
        write_eg(obs, b as u32)?;
    }
    Ok(src.len())
}

pub(crate) fn decode<R: Read>(ibs: &mut InputBitStream<R>, dst: &mut [u8]) -> Result<usize> {
    for slot in dst.iter_mut() {
        // Byte values always fit: the prefix guard in read_eg rejects
        // anything wider than 32 bits, and the cast below truncates nothing
        // for well-formed streams.
        *slot = read_eg(ibs)? as u8;
    }
    Ok(dst.len())
}
