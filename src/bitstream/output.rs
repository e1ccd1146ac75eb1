//! Buffered big-endian bit writer.

use std::io::Write;

use super::{legal_buffer_size, mask, BitStreamError, DEFAULT_BUFFER_SIZE};

/// Writes bits most-significant-first into a byte sink.
///
/// Bits accumulate into a 64-bit word; full words spill into an internal
/// buffer which is flushed to the sink when it fills up and on [`close`].
///
/// [`close`]: OutputBitStream::close
pub struct OutputBitStream<W: Write> {
    sink: W,
    buffer: Vec<u8>,
    /// Bytes used in `buffer`, always a multiple of 8 between operations.
    position: usize,
    /// Pending word; upper `64 - avail` bits hold data.
    current: u64,
    /// Free bits remaining in `current`, in `[1, 64]` between operations.
    avail: u32,
    /// Total bits accepted, excluding close-time padding.
    written: u64,
    closed: bool,
}

impl<W: Write> OutputBitStream<W> {
    /// Creates a writer with the default internal buffer.
    pub fn new(sink: W) -> Self {
        Self::with_capacity(sink, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a writer with an internal buffer of roughly `capacity` bytes
    /// (clamped to at least 1024, rounded up to a multiple of 8).
    pub fn with_capacity(sink: W, capacity: usize) -> Self {
        OutputBitStream {
            sink,
            buffer: vec![0u8; legal_buffer_size(capacity)],
            position: 0,
            current: 0,
            avail: 64,
            written: 0,
            closed: false,
        }
    }

    /// Appends a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<(), BitStreamError> {
        self.write_bits(bit as u64, 1)
    }

    /// Appends the low `count` bits of `value`, most-significant-bit first.
    /// `count` must be in `[1, 64]`.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<(), BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }
        debug_assert!((1..=64).contains(&count), "bit count {count} out of range");
        let v = value & mask(count);

        if count < self.avail {
            self.current |= v << (self.avail - count);
            self.avail -= count;
        } else {
            // avail >= 1 so remaining <= 63
            let remaining = count - self.avail;
            self.current |= v >> remaining;
            self.push_current()?;
            if remaining > 0 {
                self.current = v << (64 - remaining);
                self.avail = 64 - remaining;
            }
        }
        self.written += count as u64;
        Ok(())
    }

    /// Appends the first `count` bits of `src`, reading each byte
    /// most-significant-bit first. Uses a direct byte copy when the word
    /// cursor is byte-aligned. Returns the number of bits written.
    pub fn write_bits_from(&mut self, src: &[u8], count: usize) -> Result<usize, BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }
        let full = count / 8;
        let rem = (count & 7) as u32;
        debug_assert!(full + (rem > 0) as usize <= src.len());

        if self.avail == 64 {
            // Word cursor on a byte boundary: bulk copy through the buffer.
            let mut off = 0;
            while off < full {
                let room = self.buffer.len() - self.position;
                let n = room.min(full - off);
                self.buffer[self.position..self.position + n]
                    .copy_from_slice(&src[off..off + n]);
                self.position += n;
                off += n;
                if self.position == self.buffer.len() {
                    self.flush_buffer()?;
                }
            }
            // Re-seed the word cursor if the copy left us mid-word.
            let tail = self.position & 7;
            if tail != 0 {
                let start = self.position - tail;
                let mut word = 0u64;
                for i in 0..tail {
                    word = (word << 8) | self.buffer[start + i] as u64;
                }
                self.position = start;
                self.current = word << (64 - 8 * tail as u32);
                self.avail = 64 - 8 * tail as u32;
            }
            self.written += (full * 8) as u64;
        } else {
            for &b in &src[..full] {
                self.write_bits(b as u64, 8)?;
            }
        }

        if rem > 0 {
            let b = src[full] >> (8 - rem);
            self.write_bits(b as u64, rem)?;
        }
        Ok(count)
    }

    /// Total bits accepted so far (padding added by `close` not included).
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes residual bits, padding the last byte with zeros on the right,
    /// and closes the stream. Idempotent; writing after close fails with
    /// [`BitStreamError::StreamClosed`].
    pub fn close(&mut self) -> Result<(), BitStreamError> {
        if self.closed {
            return Ok(());
        }
        let used = 64 - self.avail;
        if used > 0 {
            let nbytes = ((used + 7) / 8) as usize;
            // The buffer is flushed whenever it fills, so 8 bytes of room
            // are always available here.
            for i in 0..nbytes {
                self.buffer[self.position + i] = (self.current >> (56 - 8 * i as u32)) as u8;
            }
            self.position += nbytes;
            self.current = 0;
            self.avail = 64;
        }
        self.flush_buffer()?;
        self.sink.flush()?;
        self.closed = true;
        Ok(())
    }

    /// Consumes the stream and returns the underlying sink.
    /// Call [`close`](Self::close) first to avoid losing buffered bits.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn push_current(&mut self) -> Result<(), BitStreamError> {
        self.buffer[self.position..self.position + 8].copy_from_slice(&self.current.to_be_bytes());
        self.position += 8;
        self.current = 0;
        self.avail = 64;
        if self.position == self.buffer.len() {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<(), BitStreamError> {
        if self.position > 0 {
            self.sink.write_all(&self.buffer[..self.position])?;
            self.position = 0;
        }
        Ok(())
    }
}
