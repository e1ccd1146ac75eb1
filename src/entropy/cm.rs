//! Context-mixing binary codec, small variant.
//!
//! Two bit models — order 1 and a hashed order 2 — are averaged in the
//! probability domain and both updated after every bit. Encoder and decoder
//! share the model code, so their states evolve in lockstep.

use std::io::{Read, Write};

use super::binary::{adapt, BinaryDecoder, BinaryEncoder, PROB_HALF};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const RATE1: u32 = 4;
const RATE2: u32 = 6;
const ORDER2_SIZE: usize = 1 << 16;

struct Model {
    /// Order-1 cells: previous byte x within-byte tree node.
    t1: Vec<u16>,
    /// Hashed order-2 cells.
    t2: Vec<u16>,
    prev1: u8,
    prev2: u8,
}

impl Model {
    fn new() -> Self {
        Model {
            t1: vec![PROB_HALF; 256 * 256],
            t2: vec![PROB_HALF; ORDER2_SIZE],
            prev1: 0,
            prev2: 0,
        }
    }

    #[inline]
    fn indices(&self, ctx: usize) -> (usize, usize) {
        let i1 = ((self.prev1 as usize) << 8) | ctx;
        let h = (self.prev1 as usize)
            .wrapping_mul(0x9E37)
            .wrapping_add((self.prev2 as usize).wrapping_mul(0x79B9));
        let i2 = ((h & 0xFF) << 8) | ctx;
        (i1, i2)
    }

    #[inline]
    fn predict(&self, i1: usize, i2: usize) -> u16 {
        let p = (self.t1[i1] as u32 + self.t2[i2] as u32 + 1) >> 1;
        (p as u16).clamp(1, (1 << 12) - 1)
    }

    #[inline]
    fn update(&mut self, i1: usize, i2: usize, bit: u8) {
        self.t1[i1] = adapt(self.t1[i1], bit, RATE1);
        self.t2[i2] = adapt(self.t2[i2], bit, RATE2);
    }

    #[inline]
    fn push_byte(&mut self, b: u8) {
        self.prev2 = self.prev1;
        self.prev1 = b;
    }
}

pub(crate) fn encode<W: Write>(obs: &mut OutputBitStream<W>, src: &[u8]) -> Result<usize> {
    let mut model = Model::new();
    let mut enc = BinaryEncoder::new();
    for &b in src {
        let mut ctx = 1usize;
        for shift in (0..8).rev() {
            let bit = (b >> shift) & 1;
            let (i1, i2) = model.indices(ctx);
            enc.encode_bit(obs, model.predict(i1, i2), bit)?;
            model.update(i1, i2, bit);
            ctx = (ctx << 1) | bit as usize;
        }
        model.push_byte(b);
    }
    enc.finish(obs)?;
    Ok(src.len())
}

pub(crate) fn decode<R: Read>(ibs: &mut InputBitStream<R>, dst: &mut [u8]) -> Result<usize> {
    let mut model = Model::new();
    let mut dec = BinaryDecoder::new(ibs)?;
    for slot in dst.iter_mut() {
        let mut ctx = 1usize;
        while ctx < 256 {
            let (i1, i2) = model.indices(ctx);
            let bit = dec.decode_bit(ibs, model.predict(i1, i2))?;
            model.update(i1, i2, bit);
            ctx = (ctx << 1) | bit as usize;
        }
        let b = (ctx & 0xFF) as u8;
        model.push_byte(b);
        *slot = b;
    }
    Ok(dst.len())
}
