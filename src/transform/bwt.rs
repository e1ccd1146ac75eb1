//! Burrows-Wheeler transform over full cyclic rotations.
//!
//! Forward sorts the rotation set with prefix doubling (ranks compared at
//! distance `k`, doubled each pass), emits the last column and a 4-byte
//! big-endian primary index (the row holding the original block). Inverse
//! rebuilds the block backwards through the LF mapping.

use crate::error::Result;

use super::invalid_block;

const HEADER_LEN: usize = 4;
const MIN_BLOCK_LEN: usize = 16;

pub(crate) fn forward(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    let n = src.len();
    if n < MIN_BLOCK_LEN {
        return None;
    }

    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = src.iter().map(|&b| b as u32).collect();
    let mut next_rank = vec![0u32; n];

    let mut k = 1usize;
    loop {
        let key = |i: u32| -> (u32, u32) {
            let i = i as usize;
            (rank[i], rank[(i + k) % n])
        };
        sa.sort_unstable_by_key(|&i| key(i));

        next_rank[sa[0] as usize] = 0;
        let mut max_rank = 0u32;
        for j in 1..n {
            let bump = (key(sa[j]) != key(sa[j - 1])) as u32;
            max_rank += bump;
            next_rank[sa[j] as usize] = max_rank;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        if max_rank as usize == n - 1 || k >= n {
            break;
        }
        k *= 2;
    }

    let primary = sa.iter().position(|&i| i == 0).expect("rotation 0 present") as u32;
    dst[..HEADER_LEN].copy_from_slice(&primary.to_be_bytes());
    for (j, &start) in sa.iter().enumerate() {
        dst[HEADER_LEN + j] = src[(start as usize + n - 1) % n];
    }
    Some(n + HEADER_LEN)
}

pub(crate) fn inverse(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if src.len() < HEADER_LEN + 1 {
        return Err(invalid_block("missing rotation index"));
    }
    let n = src.len() - HEADER_LEN;
    let primary = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if primary >= n {
        return Err(invalid_block("rotation index out of range"));
    }
    if dst.len() < n {
        return Err(invalid_block("inverse output exceeds buffer"));
    }
    let last = &src[HEADER_LEN..];

    // C[c] = number of symbols smaller than c across the column.
    let mut counts = [0u32; 256];
    for &b in last {
        counts[b as usize] += 1;
    }
    let mut c = [0u32; 256];
    let mut sum = 0u32;
    for s in 0..256 {
        c[s] = sum;
        sum += counts[s];
    }

    // LF mapping: row j steps to the row of the rotation one symbol earlier.
    let mut lf = vec![0u32; n];
    let mut seen = [0u32; 256];
    for j in 0..n {
        let b = last[j] as usize;
        lf[j] = c[b] + seen[b];
        seen[b] += 1;
    }

    let mut p = primary;
    for k in (0..n).rev() {
        dst[k] = last[p];
        p = lf[p] as usize;
    }
    Ok(n)
}
