//! Thin wrapper around the `xxhash-rust` crate providing the XXH32 / XXH64
//! one-shot functions used for block checksums.
//!
//! Block checksums are always seeded with the container magic
//! ([`CHECKSUM_SEED`]) so a block hashed outside a KANZ stream cannot be
//! confused with one inside it.

/// Seed applied to every block checksum: the "KANZ" magic.
pub const CHECKSUM_SEED: u32 = 0x4B41_4E5A;

/// One-shot XXH32 hash.
#[inline]
pub fn xxh32(data: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(data, seed)
}

/// One-shot XXH64 hash.
#[inline]
pub fn xxh64(data: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh64::xxh64(data, seed)
}

/// Per-stream checksum width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumKind {
    /// No per-block checksum.
    #[default]
    None,
    /// 32-bit XXH32 per block.
    Xxh32,
    /// 64-bit XXH64 per block.
    Xxh64,
}

impl ChecksumKind {
    /// Width of the stored checksum field in bits (0 when disabled).
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            ChecksumKind::None => 0,
            ChecksumKind::Xxh32 => 32,
            ChecksumKind::Xxh64 => 64,
        }
    }

    /// Two-bit field stored in the stream header.
    #[inline]
    pub fn id(self) -> u32 {
        match self {
            ChecksumKind::None => 0,
            ChecksumKind::Xxh32 => 1,
            ChecksumKind::Xxh64 => 2,
        }
    }

    /// Decodes the two-bit header field; 3 is reserved and invalid.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(ChecksumKind::None),
            1 => Some(ChecksumKind::Xxh32),
            2 => Some(ChecksumKind::Xxh64),
            _ => None,
        }
    }

    /// Hashes `data` with the stream seed, widened to `u64` for uniform
    /// handling. Returns 0 when checksums are disabled.
    pub fn compute(self, data: &[u8]) -> u64 {
        match self {
            ChecksumKind::None => 0,
            ChecksumKind::Xxh32 => xxh32(data, CHECKSUM_SEED) as u64,
            ChecksumKind::Xxh64 => xxh64(data, CHECKSUM_SEED as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxh32_reference_vector() {
        // Reference value for the empty input with seed 0.
        assert_eq!(xxh32(b"", 0), 0x02CC_5D05);
    }

    #[test]
    fn checksum_kind_ids_roundtrip() {
        for k in [ChecksumKind::None, ChecksumKind::Xxh32, ChecksumKind::Xxh64] {
            assert_eq!(ChecksumKind::from_id(k.id()), Some(k));
        }
        assert_eq!(ChecksumKind::from_id(3), None);
    }

    #[test]
    fn widths_match_kinds() {
        assert_eq!(ChecksumKind::None.bits(), 0);
        assert_eq!(ChecksumKind::Xxh32.bits(), 32);
        assert_eq!(ChecksumKind::Xxh64.bits(), 64);
    }

    #[test]
    fn seeded_hashes_differ_from_unseeded() {
        let data = b"kanzi block data";
        assert_ne!(xxh32(data, CHECKSUM_SEED), xxh32(data, 0));
        assert_ne!(xxh64(data, CHECKSUM_SEED as u64), xxh64(data, 0));
    }
}
