//! Compressed stream pair and the KANZ container framing.
//!
//! [`CompressedOutputStream`] partitions written bytes into fixed-size blocks
//! and runs the transform+entropy pipeline over them, emitting a strictly
//! ordered bitstream; [`CompressedInputStream`] is its reading counterpart.
//! `header` holds the file-level frame.

pub mod compress;
pub mod decompress;
pub mod header;

pub use compress::CompressedOutputStream;
pub use decompress::CompressedInputStream;
pub use header::{StreamParams, BITSTREAM_MAGIC, BITSTREAM_VERSION};

use std::sync::atomic::{AtomicI32, Ordering};

use crate::entropy::EntropyType;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::ChecksumKind;
use crate::transform::TransformChain;

/// Smallest accepted block size.
pub const MIN_BLOCK_SIZE: usize = 1024;
/// Largest accepted block size.
pub const MAX_BLOCK_SIZE: usize = 1 << 30;
/// Most workers a stream will drive.
pub const MAX_JOBS: usize = 64;
/// Sentinel stored in the block-order gate to collapse all waiters.
pub(crate) const CANCELED_BLOCK_ID: i32 = -1;
/// Largest legal block frame, in bits.
pub(crate) const MAX_FRAME_BITS: u64 = 1 << 34;

/// Post-transform length ceiling before a block falls back to copy mode.
#[inline]
pub(crate) fn max_transformed_len(block_size: usize) -> usize {
    (block_size + block_size / 2).max(2048)
}

/// Validates a block size against the container limits.
pub(crate) fn check_block_size(block_size: usize) -> Result<()> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) || block_size % 16 != 0 {
        return Err(Error::new(
            ErrorKind::BlockSize,
            format!(
                "block size {block_size} not in [{MIN_BLOCK_SIZE}, {MAX_BLOCK_SIZE}] or not a multiple of 16"
            ),
        ));
    }
    Ok(())
}

/// Validates a worker count.
pub(crate) fn check_jobs(jobs: usize) -> Result<()> {
    if !(1..=MAX_JOBS).contains(&jobs) {
        return Err(Error::new(
            ErrorKind::InvalidParam,
            format!("jobs {jobs} not in [1, {MAX_JOBS}]"),
        ));
    }
    Ok(())
}

/// Per-block pipeline settings shared by every worker of one stream.
#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    pub entropy: EntropyType,
    pub transforms: TransformChain,
    pub checksum: ChecksumKind,
    pub block_size: usize,
}

/// Spin-yield until the gate reaches `block_id - 1`. Returns `false` when the
/// stream was canceled instead.
pub(crate) fn await_turn(gate: &AtomicI32, block_id: i32) -> bool {
    loop {
        match gate.load(Ordering::Acquire) {
            CANCELED_BLOCK_ID => return false,
            cur if cur == block_id - 1 => return true,
            _ => {
                std::hint::spin_loop();
                std::thread::yield_now();
            }
        }
    }
}

/// Releases the gate after `block_id` finished its serialized section.
/// Leaves a cancellation in place if one arrived meanwhile.
pub(crate) fn release_turn(gate: &AtomicI32, block_id: i32) -> bool {
    gate.compare_exchange(block_id - 1, block_id, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Collapses every waiter; the first cancellation wins.
pub(crate) fn cancel_all(gate: &AtomicI32) {
    gate.store(CANCELED_BLOCK_ID, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_limits() {
        assert!(check_block_size(1024).is_ok());
        assert!(check_block_size(1 << 30).is_ok());
        assert!(check_block_size(1000).is_err());
        assert!(check_block_size(1024 + 8).is_err());
        assert!(check_block_size((1 << 30) + 16).is_err());
    }

    #[test]
    fn transformed_len_floor() {
        assert_eq!(max_transformed_len(1024), 2048);
        assert_eq!(max_transformed_len(1 << 20), (1 << 20) + (1 << 19));
    }

    #[test]
    fn gate_protocol() {
        let gate = AtomicI32::new(0);
        assert!(await_turn(&gate, 1));
        assert!(release_turn(&gate, 1));
        assert!(await_turn(&gate, 2));
        cancel_all(&gate);
        assert!(!release_turn(&gate, 2));
        assert!(!await_turn(&gate, 3));
    }
}
