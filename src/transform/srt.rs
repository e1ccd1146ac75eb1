//! Sorted rank transform.
//!
//! The symbol table starts ordered by descending block frequency (shipped in
//! a small header) and adapts with a transpose step: a used symbol swaps one
//! position toward the front. Compared to move-to-front this reacts more
//! slowly, which suits data with stable symbol ranking.

use crate::error::Result;

use super::invalid_block;

/// Header-dominated below this size.
const MIN_BLOCK_LEN: usize = 1024;

pub(crate) fn forward(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    let n = src.len();
    if n < MIN_BLOCK_LEN {
        return None;
    }
    let mut freqs = [0u32; 256];
    for &b in src {
        freqs[b as usize] += 1;
    }
    let mut symbols: Vec<u8> = (0..=255u8).filter(|&s| freqs[s as usize] > 0).collect();
    symbols.sort_by_key(|&s| (std::cmp::Reverse(freqs[s as usize]), s));
    let count = symbols.len();

    // Header: symbol count - 1, then the initial table.
    let mut out = 0;
    dst[out] = (count - 1) as u8;
    out += 1;
    dst[out..out + count].copy_from_slice(&symbols);
    out += count;

    let mut table = symbols.clone();
    let mut rank = [0usize; 256];
    for (r, &s) in table.iter().enumerate() {
        rank[s as usize] = r;
    }

    for &b in src {
        let r = rank[b as usize];
        dst[out] = r as u8;
        out += 1;
        if r > 0 {
            let other = table[r - 1];
            table.swap(r - 1, r);
            rank[other as usize] = r;
            rank[b as usize] = r - 1;
        }
    }
    Some(out)
}

pub(crate) fn inverse(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if src.is_empty() {
        return Err(invalid_block("missing rank table header"));
    }
    let count = src[0] as usize + 1;
    if src.len() < 1 + count {
        return Err(invalid_block("truncated rank table"));
    }
    let mut table: Vec<u8> = src[1..1 + count].to_vec();
    let body = &src[1 + count..];
    if dst.len() < body.len() {
        return Err(invalid_block("inverse output exceeds buffer"));
    }

    for (i, &r) in body.iter().enumerate() {
        let r = r as usize;
        if r >= count {
            return Err(invalid_block("rank outside symbol table"));
        }
        let b = table[r];
        dst[i] = b;
        if r > 0 {
            table.swap(r - 1, r);
        }
    }
    Ok(body.len())
}
