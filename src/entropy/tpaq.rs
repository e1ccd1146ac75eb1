//! Context-mixing binary codec, large variant.
//!
//! Four bit models (orders 1, 2, 4 hashed, and a sparse two-back context)
//! feed an adaptive linear mixer whose integer weights are trained on the
//! prediction error. All state transitions are deterministic and shared by
//! both directions.

use std::io::{Read, Write};

use super::binary::{adapt, BinaryDecoder, BinaryEncoder, PROB_HALF, PROB_ONE};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const NB_MODELS: usize = 4;
const TABLE_BITS: usize = 16;
const TABLE_SIZE: usize = 1 << TABLE_BITS;
const RATE: u32 = 4;
/// Initial mixer weight: an even split across models in 16.16 fixed point.
const INIT_WEIGHT: i32 = (1 << 16) / NB_MODELS as i32;

struct Mixer {
    weights: [i32; NB_MODELS],
}

impl Mixer {
    fn new() -> Self {
        Mixer { weights: [INIT_WEIGHT; NB_MODELS] }
    }

    /// Mixes centered model outputs; result clamped to a legal probability.
    fn mix(&self, probs: &[u16; NB_MODELS]) -> u16 {
        let mut acc = 0i64;
        for i in 0..NB_MODELS {
            acc += self.weights[i] as i64 * (probs[i] as i64 - PROB_HALF as i64);
        }
        let p = PROB_HALF as i64 + (acc >> 16);
        p.clamp(1, (PROB_ONE - 1) as i64) as u16
    }

    fn update(&mut self, probs: &[u16; NB_MODELS], mixed: u16, bit: u8) {
        let target = if bit == 0 { PROB_ONE as i32 } else { 0 };
        let err = target - mixed as i32;
        for i in 0..NB_MODELS {
            let centered = probs[i] as i32 - PROB_HALF as i32;
            self.weights[i] += (err * centered) >> 14;
            self.weights[i] = self.weights[i].clamp(-(1 << 18), 1 << 18);
        }
    }
}

struct Model {
    tables: Vec<Vec<u16>>,
    /// Rolling history of the last 8 bytes, most recent in the low byte.
    history: u64,
}

impl Model {
    fn new() -> Self {
        Model {
            tables: (0..NB_MODELS).map(|_| vec![PROB_HALF; TABLE_SIZE]).collect(),
            history: 0,
        }
    }

    /// Table index per model for the current bit context.
    fn indices(&self, ctx: usize) -> [usize; NB_MODELS] {
        let h = self.history;
        let mask = TABLE_SIZE - 1;
        [
            // order 1
            ((((h & 0xFF) as usize) << 8) | ctx) & mask,
            // order 2
            (hash64(h & 0xFFFF) ^ ctx) & mask,
            // order 4
            (hash64(h & 0xFFFF_FFFF) ^ ctx) & mask,
            // sparse: bytes 2 and 4 back
            (hash64(((h >> 8) & 0xFF) | ((h >> 16) & 0xFF00)) ^ ctx) & mask,
        ]
    }

    fn predict(&self, idx: &[usize; NB_MODELS]) -> [u16; NB_MODELS] {
        let mut out = [0u16; NB_MODELS];
        for i in 0..NB_MODELS {
            out[i] = self.tables[i][idx[i]];
        }
        out
    }

    fn update(&mut self, idx: &[usize; NB_MODELS], bit: u8) {
        for i in 0..NB_MODELS {
            let p = self.tables[i][idx[i]];
            self.tables[i][idx[i]] = adapt(p, bit, RATE);
        }
    }

    fn push_byte(&mut self, b: u8) {
        self.history = (self.history << 8) | b as u64;
    }
}

#[inline]
fn hash64(v: u64) -> usize {
    (v.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 40) as usize
}

pub(crate) fn encode<W: Write>(obs: &mut OutputBitStream<W>, src: &[u8]) -> Result<usize> {
    let mut model = Model::new();
    let mut mixer = Mixer::new();
    let mut enc = BinaryEncoder::new();
    for &b in src {
        let mut ctx = 1usize;
        for shift in (0..8).rev() {
            let bit = (b >> shift) & 1;
            let idx = model.indices(ctx);
            let probs = model.predict(&idx);
            let mixed = mixer.mix(&probs);
            enc.encode_bit(obs, mixed, bit)?;
            mixer.update(&probs, mixed, bit);
            model.update(&idx, bit);
            ctx = (ctx << 1) | bit as usize;
        }
        model.push_byte(b);
    }
    enc.finish(obs)?;
    Ok(src.len())
}

pub(crate) fn decode<R: Read>(ibs: &mut InputBitStream<R>, dst: &mut [u8]) -> Result<usize> {
    let mut model = Model::new();
    let mut mixer = Mixer::new();
    let mut dec = BinaryDecoder::new(ibs)?;
    for slot in dst.iter_mut() {
        let mut ctx = 1usize;
        while ctx < 256 {
            let idx = model.indices(ctx);
            let probs = model.predict(&idx);
            let mixed = mixer.mix(&probs);
            let bit = dec.decode_bit(ibs, mixed)?;
            mixer.update(&probs, mixed, bit);
            model.update(&idx, bit);
            ctx = (ctx << 1) | bit as usize;
        }
        let b = (ctx & 0xFF) as u8;
        model.push_byte(b);
        *slot = b;
    }
    Ok(dst.len())
}
