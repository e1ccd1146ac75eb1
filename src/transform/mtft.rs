//! Move-to-front transform.
//!
//! Each byte is replaced by its index in a recency list which then moves the
//! byte to the front. Length-preserving and always applicable.

use crate::error::Result;

use super::invalid_block;

pub(crate) fn forward(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
    for (i, &b) in src.iter().enumerate() {
        let rank = table.iter().position(|&s| s == b).unwrap();
        dst[i] = rank as u8;
        table.copy_within(0..rank, 1);
        table[0] = b;
    }
    Some(src.len())
}

pub(crate) fn inverse(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if dst.len() < src.len() {
        return Err(invalid_block("inverse output exceeds buffer"));
    }
    let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
    for (i, &r) in src.iter().enumerate() {
        let rank = r as usize;
        let b = table[rank];
        dst[i] = b;
        table.copy_within(0..rank, 1);
        table[0] = b;
    }
    Ok(src.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_symbols_get_low_ranks() {
        let data = b"aaaabbbbaaaa";
        let mut dst = vec![0u8; data.len()];
        forward(data, &mut dst).unwrap();
        // After the first 'a', repeats rank 0.
        assert_eq!(dst[1], 0);
        assert_eq!(dst[2], 0);
        // Returning to 'a' after 'b' ranks 1.
        assert_eq!(dst[8], 1);

        let mut back = vec![0u8; data.len()];
        let m = inverse(&dst, &mut back).unwrap();
        assert_eq!(&back[..m], data);
    }

    #[test]
    fn full_alphabet_roundtrip() {
        let data: Vec<u8> = (0u8..=255).rev().cycle().take(3000).collect();
        let mut dst = vec![0u8; data.len()];
        forward(&data, &mut dst).unwrap();
        let mut back = vec![0u8; data.len()];
        inverse(&dst, &mut back).unwrap();
        assert_eq!(back, data);
    }
}
