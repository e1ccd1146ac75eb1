//! Shared binary range coder used by the adaptive bit-model codecs.
//!
//! Carry-cached byte-oriented coder: 32-bit range, 33-bit low with the carry
//! propagated through a cache/pending-0xFF pair. Probabilities are 12-bit and
//! express P(bit == 0); callers keep them in `[1, 4095]`.

use std::io::{Read, Write};

use super::{read_err, write_err};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

pub(crate) const PROB_BITS: u32 = 12;
pub(crate) const PROB_ONE: u16 = 1 << PROB_BITS;
/// Neutral starting probability.
pub(crate) const PROB_HALF: u16 = PROB_ONE / 2;

const TOP: u32 = 1 << 24;

pub(crate) struct BinaryEncoder {
    low: u64,
    range: u32,
    cache: u8,
    cache_size: u64,
}

impl BinaryEncoder {
    pub(crate) fn new() -> Self {
        BinaryEncoder { low: 0, range: u32::MAX, cache: 0, cache_size: 1 }
    }

    /// Encodes one bit under probability `p0` = P(bit == 0).
    pub(crate) fn encode_bit<W: Write>(
        &mut self,
        obs: &mut OutputBitStream<W>,
        p0: u16,
        bit: u8,
    ) -> Result<()> {
        debug_assert!((1..PROB_ONE).contains(&p0));
        let bound = (self.range >> PROB_BITS) * p0 as u32;
        if bit == 0 {
            self.range = bound;
        } else {
            self.low += bound as u64;
            self.range -= bound;
        }
        while self.range < TOP {
            self.shift_low(obs)?;
            self.range <<= 8;
        }
        Ok(())
    }

    /// Flushes the coder; must be called exactly once after the last bit.
    pub(crate) fn finish<W: Write>(&mut self, obs: &mut OutputBitStream<W>) -> Result<()> {
        for _ in 0..5 {
            self.shift_low(obs)?;
        }
        Ok(())
    }

    fn shift_low<W: Write>(&mut self, obs: &mut OutputBitStream<W>) -> Result<()> {
        if (self.low as u32) < 0xFF00_0000 || (self.low >> 32) != 0 {
            let carry = (self.low >> 32) as u8;
            let mut byte = self.cache;
            loop {
                obs.write_bits(byte.wrapping_add(carry) as u64, 8).map_err(write_err)?;
                byte = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low << 8) & 0xFFFF_FFFF;
        Ok(())
    }
}

pub(crate) struct BinaryDecoder {
    code: u32,
    range: u32,
}

impl BinaryDecoder {
    pub(crate) fn new<R: Read>(ibs: &mut InputBitStream<R>) -> Result<Self> {
        let mut code = 0u32;
        // First byte is the encoder's initial zero cache.
        for _ in 0..5 {
            code = (code << 8) | ibs.read_bits(8).map_err(read_err)? as u32;
        }
        Ok(BinaryDecoder { code, range: u32::MAX })
    }

    pub(crate) fn decode_bit<R: Read>(
        &mut self,
        ibs: &mut InputBitStream<R>,
        p0: u16,
    ) -> Result<u8> {
        debug_assert!((1..PROB_ONE).contains(&p0));
        let bound = (self.range >> PROB_BITS) * p0 as u32;
        let bit = if self.code < bound {
            self.range = bound;
            0
        } else {
            self.code -= bound;
            self.range -= bound;
            1
        };
        while self.range < TOP {
            self.code = (self.code << 8) | ibs.read_bits(8).map_err(read_err)? as u32;
            self.range <<= 8;
        }
        Ok(bit)
    }
}

/// Shift-register probability update toward the observed bit.
/// `rate` controls adaptation speed; the value never leaves `(0, PROB_ONE)`.
#[inline]
pub(crate) fn adapt(p0: u16, bit: u8, rate: u32) -> u16 {
    if bit == 0 {
        p0 + ((PROB_ONE - p0) >> rate)
    } else {
        p0 - (p0 >> rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn static_probability_roundtrip() {
        let bits: Vec<u8> = (0..4000u32).map(|i| ((i * 7) % 11 == 0) as u8).collect();
        let mut obs = OutputBitStream::new(Vec::new());
        let mut enc = BinaryEncoder::new();
        for &b in &bits {
            enc.encode_bit(&mut obs, 3500, b).unwrap();
        }
        enc.finish(&mut obs).unwrap();
        obs.close().unwrap();

        let mut ibs = InputBitStream::new(Cursor::new(obs.into_inner()));
        let mut dec = BinaryDecoder::new(&mut ibs).unwrap();
        for &b in &bits {
            assert_eq!(dec.decode_bit(&mut ibs, 3500).unwrap(), b);
        }
    }

    #[test]
    fn adapt_stays_in_range() {
        let mut p = PROB_HALF;
        for _ in 0..100_000 {
            p = adapt(p, 1, 4);
            assert!(p >= 1);
        }
        for _ in 0..100_000 {
            p = adapt(p, 0, 4);
            assert!(p < PROB_ONE);
        }
    }
}
