//! Big-endian bit-level I/O over byte streams.
//!
//! Both directions buffer a 64-bit word at a time on top of an internal byte
//! buffer: writes accumulate into `current` and spill to the buffer 8 bytes at
//! a time; reads pull 8 bytes at a time into `current` and hand out slices of
//! it. Bits travel most-significant-bit first, so a value written with
//! `write_bits(v, n)` occupies the same positions any big-endian byte dump of
//! the stream would show.
//!
//! The byte-aligned bulk paths ([`OutputBitStream::write_bits_from`],
//! [`InputBitStream::read_bits_into`]) fall back to straight byte copies when
//! the word cursor sits on a byte boundary, which is what makes the ordered
//! payload hand-off between block workers cheap.

mod input;
mod output;

pub use input::InputBitStream;
pub use output::OutputBitStream;

use core::fmt;
use std::io;

/// Default internal buffer size in bytes.
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 32768;

/// Smallest accepted internal buffer size.
pub(crate) const MIN_BUFFER_SIZE: usize = 1024;

/// Failures surfaced by the bit layer.
#[derive(Debug)]
pub enum BitStreamError {
    /// Not enough bits left in the underlying stream to satisfy the request.
    EndOfStream,
    /// The stream was closed and can no longer be read or written.
    StreamClosed,
    /// The underlying byte source or sink failed.
    InputOutput(io::Error),
}

impl fmt::Display for BitStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitStreamError::EndOfStream => f.write_str("end of bitstream"),
            BitStreamError::StreamClosed => f.write_str("bitstream closed"),
            BitStreamError::InputOutput(e) => write!(f, "bitstream I/O failure: {e}"),
        }
    }
}

impl std::error::Error for BitStreamError {}

impl From<io::Error> for BitStreamError {
    fn from(e: io::Error) -> Self {
        BitStreamError::InputOutput(e)
    }
}

/// Low `n` bits set; `n` may be 0 or 64.
#[inline]
pub(crate) fn mask(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Clamp a requested buffer size to a legal one (at least
/// [`MIN_BUFFER_SIZE`], multiple of 8).
pub(crate) fn legal_buffer_size(requested: usize) -> usize {
    let s = requested.max(MIN_BUFFER_SIZE);
    (s + 7) & !7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_widths() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 1);
        assert_eq!(mask(8), 0xFF);
        assert_eq!(mask(63), u64::MAX >> 1);
        assert_eq!(mask(64), u64::MAX);
    }

    #[test]
    fn buffer_size_is_clamped() {
        assert_eq!(legal_buffer_size(0), MIN_BUFFER_SIZE);
        assert_eq!(legal_buffer_size(1025), 1032);
        assert_eq!(legal_buffer_size(32768), 32768);
    }

    #[test]
    fn roundtrip_all_widths() {
        let mut obs = OutputBitStream::new(Vec::new());
        for n in 1..=64u32 {
            obs.write_bits(0xA5A5_5A5A_F00F_0FF0, n).unwrap();
        }
        obs.close().unwrap();
        let bytes = obs.into_inner();

        let mut ibs = InputBitStream::new(std::io::Cursor::new(bytes));
        for n in 1..=64u32 {
            let expected = 0xA5A5_5A5A_F00F_0FF0u64 & mask(n);
            assert_eq!(ibs.read_bits(n).unwrap(), expected, "width {n}");
        }
    }

    #[test]
    fn roundtrip_single_bits() {
        let pattern = [1u8, 0, 0, 1, 1, 1, 0, 1, 0, 0, 1];
        let mut obs = OutputBitStream::new(Vec::new());
        for &b in &pattern {
            obs.write_bit(b != 0).unwrap();
        }
        obs.close().unwrap();
        let bytes = obs.into_inner();
        // 11 bits pad to 2 bytes, zeros on the right.
        assert_eq!(bytes.len(), 2);

        let mut ibs = InputBitStream::new(std::io::Cursor::new(bytes));
        for &b in &pattern {
            assert_eq!(ibs.read_bit().unwrap(), b != 0);
        }
    }

    #[test]
    fn bulk_copy_roundtrip_unaligned() {
        let payload: Vec<u8> = (0..255u8).collect();
        let mut obs = OutputBitStream::new(Vec::new());
        // 3 leading bits force the slow path on both sides.
        obs.write_bits(0b101, 3).unwrap();
        obs.write_bits_from(&payload, payload.len() * 8 - 5).unwrap();
        obs.close().unwrap();
        let bytes = obs.into_inner();

        let mut ibs = InputBitStream::new(std::io::Cursor::new(bytes));
        assert_eq!(ibs.read_bits(3).unwrap(), 0b101);
        let mut back = vec![0u8; payload.len()];
        ibs.read_bits_into(&mut back, payload.len() * 8 - 5).unwrap();
        assert_eq!(&back[..payload.len() - 1], &payload[..payload.len() - 1]);
        // Final partial byte keeps its top 3 bits.
        assert_eq!(back[payload.len() - 1] & 0xE0, payload[payload.len() - 1] & 0xE0);
    }

    #[test]
    fn written_and_read_counters() {
        let mut obs = OutputBitStream::new(Vec::new());
        obs.write_bits(1, 13).unwrap();
        obs.write_bits(1, 64).unwrap();
        assert_eq!(obs.written(), 77);
        obs.close().unwrap();
        let bytes = obs.into_inner();

        let mut ibs = InputBitStream::new(std::io::Cursor::new(bytes));
        ibs.read_bits(13).unwrap();
        ibs.read_bits(64).unwrap();
        assert_eq!(ibs.read(), 77);
    }

    #[test]
    fn full_word_reads_on_word_boundaries() {
        let mut obs = OutputBitStream::new(Vec::new());
        obs.write_bits(u64::MAX, 64).unwrap();
        obs.write_bits(0x0123_4567_89AB_CDEF, 64).unwrap();
        obs.close().unwrap();
        let mut ibs = InputBitStream::new(std::io::Cursor::new(obs.into_inner()));
        assert_eq!(ibs.read_bits(64).unwrap(), u64::MAX);
        assert_eq!(ibs.read_bits(64).unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn eof_mid_word_is_reported() {
        let mut ibs = InputBitStream::new(std::io::Cursor::new(vec![0xAB, 0xCD]));
        assert!(matches!(ibs.read_bits(24), Err(BitStreamError::EndOfStream)));
    }

    #[test]
    fn closed_streams_reject_operations() {
        let mut obs = OutputBitStream::new(Vec::new());
        obs.write_bits(3, 2).unwrap();
        obs.close().unwrap();
        obs.close().unwrap(); // idempotent
        assert!(matches!(obs.write_bit(true), Err(BitStreamError::StreamClosed)));

        let mut ibs = InputBitStream::new(std::io::Cursor::new(vec![0u8; 8]));
        ibs.close();
        ibs.close();
        assert!(matches!(ibs.read_bits(8), Err(BitStreamError::StreamClosed)));
    }
}
