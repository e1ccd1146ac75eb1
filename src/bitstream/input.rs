//! Buffered big-endian bit reader.

use std::io::{self, Read};

use super::{legal_buffer_size, mask, BitStreamError, DEFAULT_BUFFER_SIZE};

/// Reads bits most-significant-first from a byte source.
///
/// End of input inside a request is reported as
/// [`BitStreamError::EndOfStream`]; the bits already consumed by the failed
/// request are not restored, so callers treat it as fatal for the stream.
pub struct InputBitStream<R: Read> {
    source: R,
    buffer: Vec<u8>,
    /// Next unread byte in `buffer`.
    position: usize,
    /// Valid bytes in `buffer`.
    size: usize,
    /// Pending word; its low `avail` bits are the next bits to deliver.
    current: u64,
    avail: u32,
    /// Total bits consumed.
    read: u64,
    closed: bool,
}

impl<R: Read> InputBitStream<R> {
    /// Creates a reader with the default internal buffer.
    pub fn new(source: R) -> Self {
        Self::with_capacity(source, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a reader with an internal buffer of roughly `capacity` bytes.
    pub fn with_capacity(source: R, capacity: usize) -> Self {
        InputBitStream {
            source,
            buffer: vec![0u8; legal_buffer_size(capacity)],
            position: 0,
            size: 0,
            current: 0,
            avail: 0,
            read: 0,
            closed: false,
        }
    }

    /// Reads one bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool, BitStreamError> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Reads `count` bits (`count` in `[1, 64]`) and returns them
    /// right-aligned in a `u64`.
    pub fn read_bits(&mut self, count: u32) -> Result<u64, BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }
        debug_assert!((1..=64).contains(&count), "bit count {count} out of range");

        let res = if count <= self.avail {
            self.avail -= count;
            (self.current >> self.avail) & mask(count)
        } else {
            let hi_bits = self.avail;
            let hi = self.current & mask(hi_bits);
            let need = count - hi_bits;
            self.pull_current()?;
            if self.avail < need {
                return Err(BitStreamError::EndOfStream);
            }
            self.avail -= need;
            // need == 64 only when the word was empty, so hi is 0 then.
            let high_part = if need == 64 { 0 } else { hi << need };
            high_part | ((self.current >> self.avail) & mask(need))
        };
        self.read += count as u64;
        Ok(res)
    }

    /// Reads `count` bits into `dst`, filling each byte
    /// most-significant-bit first; a trailing partial byte keeps its bits in
    /// the top positions. Uses a direct byte copy when the word cursor is
    /// byte-aligned.
    pub fn read_bits_into(&mut self, dst: &mut [u8], count: usize) -> Result<usize, BitStreamError> {
        if self.closed {
            return Err(BitStreamError::StreamClosed);
        }
        let full = count / 8;
        let rem = (count & 7) as u32;
        debug_assert!(full + (rem > 0) as usize <= dst.len());

        let mut i = 0;
        if self.avail % 8 == 0 {
            // Drain the pending word a byte at a time, then bulk copy.
            while self.avail > 0 && i < full {
                self.avail -= 8;
                dst[i] = ((self.current >> self.avail) & 0xFF) as u8;
                i += 1;
            }
            while i < full {
                if self.position == self.size {
                    self.refill()?;
                    if self.size == 0 {
                        return Err(BitStreamError::EndOfStream);
                    }
                }
                let n = (self.size - self.position).min(full - i);
                dst[i..i + n].copy_from_slice(&self.buffer[self.position..self.position + n]);
                self.position += n;
                i += n;
            }
            self.read += (full * 8) as u64;
        } else {
            while i < full {
                dst[i] = self.read_bits(8)? as u8;
                i += 1;
            }
        }

        if rem > 0 {
            let b = self.read_bits(rem)? as u8;
            dst[full] = b << (8 - rem);
        }
        Ok(count)
    }

    /// Total bits consumed so far.
    #[inline]
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Closes the reader. Idempotent; reading afterwards fails with
    /// [`BitStreamError::StreamClosed`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Pulls up to 8 bytes into the pending word. Fails with `EndOfStream`
    /// only when no byte at all is available.
    fn pull_current(&mut self) -> Result<(), BitStreamError> {
        let mut v = 0u64;
        let mut k = 0u32;
        while k < 8 {
            if self.position == self.size {
                self.refill()?;
                if self.size == 0 {
                    break;
                }
            }
            v = (v << 8) | self.buffer[self.position] as u64;
            self.position += 1;
            k += 1;
        }
        if k == 0 {
            self.avail = 0;
            return Err(BitStreamError::EndOfStream);
        }
        self.current = v;
        self.avail = 8 * k;
        Ok(())
    }

    fn refill(&mut self) -> Result<(), BitStreamError> {
        self.position = 0;
        self.size = 0;
        loop {
            match self.source.read(&mut self.buffer[self.size..]) {
                Ok(0) => break,
                Ok(n) => {
                    self.size += n;
                    if self.size == self.buffer.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(BitStreamError::InputOutput(e)),
            }
        }
        Ok(())
    }
}
