//! Adaptive order-0 binary codec.
//!
//! Each byte is coded bit by bit, most-significant first, with one
//! probability cell per node of the within-byte binary tree.

use std::io::{Read, Write};

use super::binary::{adapt, BinaryDecoder, BinaryEncoder, PROB_HALF};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const RATE: u32 = 5;

pub(crate) fn encode<W: Write>(obs: &mut OutputBitStream<W>, src: &[u8]) -> Result<usize> {
    let mut probs = [PROB_HALF; 256];
    let mut enc = BinaryEncoder::new();
    for &b in src {
        let mut ctx = 1usize;
        for shift in (0..8).rev() {
            let bit = (b >> shift) & 1;
            let p = probs[ctx];
            enc.encode_bit(obs, p, bit)?;
            probs[ctx] = adapt(p, bit, RATE);
            ctx = (ctx << 1) | bit as usize;
        }
    }
    enc.finish(obs)?;
    Ok(src.len())
}

pub(crate) fn decode<R: Read>(ibs: &mut InputBitStream<R>, dst: &mut [u8]) -> Result<usize> {
    let mut probs = [PROB_HALF; 256];
    let mut dec = BinaryDecoder::new(ibs)?;
    for slot in dst.iter_mut() {
        let mut ctx = 1usize;
        while ctx < 256 {
            let p = probs[ctx];
            let bit = dec.decode_bit(ibs, p)?;
            probs[ctx] = adapt(p, bit, RATE);
            ctx = (ctx << 1) | bit as usize;
        }
        *slot = (ctx & 0xFF) as u8;
    }
    Ok(dst.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn constant_block_compresses_hard() {
        let data = vec![0x02u8; 40];
        let mut obs = OutputBitStream::new(Vec::new());
        encode(&mut obs, &data).unwrap();
        obs.close().unwrap();
        let bytes = obs.into_inner();
        // Flush alone is 5 bytes; a 40-byte constant block stays small but
        // non-trivial.
        assert!(bytes.len() >= 5 && bytes.len() < 40);

        let mut ibs = InputBitStream::new(Cursor::new(bytes));
        let mut back = vec![0u8; data.len()];
        decode(&mut ibs, &mut back).unwrap();
        assert_eq!(back, data);
    }
}
