//! Fixed-step delta transform.
//!
//! Replaces each byte with its wrapping difference to the byte `step`
//! positions back, after probing a small set of candidate steps (1, 2, 3, 4,
//! 8 — covering plain sequences and interleaved 2/3/4/8-byte records). The
//! header is the chosen step; the first `step` bytes pass through raw.
//! Refuses when no step concentrates the deltas near zero.

use crate::error::Result;

use super::invalid_block;

const STEPS: [usize; 5] = [1, 2, 3, 4, 8];
const MIN_BLOCK_LEN: usize = 64;

pub(crate) fn forward(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    let n = src.len();
    if n < MIN_BLOCK_LEN {
        return None;
    }

    // Pick the step whose deltas sit closest to zero (wrapping distance).
    let mut best_step = 0usize;
    let mut best_cost = u64::MAX;
    for &step in &STEPS {
        let mut cost = 0u64;
        for i in step..n {
            let d = src[i].wrapping_sub(src[i - step]);
            cost += d.min(0u8.wrapping_sub(d)) as u64;
        }
        if cost < best_cost {
            best_cost = cost;
            best_step = step;
        }
    }

    // Baseline: distance of the raw bytes from zero. Deltas must clearly
    // win, otherwise the transform only obscures the data.
    let raw_cost: u64 = src.iter().map(|&b| b.min(0u8.wrapping_sub(b)) as u64).sum();
    if best_cost >= raw_cost / 2 {
        return None;
    }

    dst[0] = best_step as u8;
    dst[1..1 + best_step].copy_from_slice(&src[..best_step]);
    let mut out = 1 + best_step;
    for i in best_step..n {
        dst[out] = src[i].wrapping_sub(src[i - best_step]);
        out += 1;
    }
    Some(out)
}

pub(crate) fn inverse(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if src.is_empty() {
        return Err(invalid_block("missing delta header"));
    }
    let step = src[0] as usize;
    if !STEPS.contains(&step) {
        return Err(invalid_block("invalid delta step"));
    }
    let body = &src[1..];
    if body.len() < step {
        return Err(invalid_block("truncated delta block"));
    }
    if dst.len() < body.len() {
        return Err(invalid_block("inverse output exceeds buffer"));
    }

    dst[..step].copy_from_slice(&body[..step]);
    for i in step..body.len() {
        dst[i] = dst[i - step].wrapping_add(body[i]);
    }
    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_picks_step_one() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i / 4) as u8).collect();
        let mut dst = vec![0u8; data.len() + 16];
        let n = forward(&data, &mut dst).unwrap();
        assert_eq!(dst[0], 1);
        let mut back = vec![0u8; data.len()];
        let m = inverse(&dst[..n], &mut back).unwrap();
        assert_eq!(&back[..m], &data[..]);
    }

    #[test]
    fn interleaved_samples_pick_wider_step() {
        // Two interleaved ramps: 16-bit-sample shape.
        let mut data = Vec::with_capacity(4096);
        for i in 0..2048u32 {
            data.push((i / 8) as u8);
            data.push(0x80u8.wrapping_add((i / 16) as u8));
        }
        let mut dst = vec![0u8; data.len() + 16];
        let n = forward(&data, &mut dst).unwrap();
        assert_eq!(dst[0], 2);
        let mut back = vec![0u8; data.len()];
        let m = inverse(&dst[..n], &mut back).unwrap();
        assert_eq!(&back[..m], &data[..]);
    }

    #[test]
    fn unstructured_data_is_refused() {
        let mut data = Vec::with_capacity(4096);
        let mut x = 0xB5AD_4ECE_DA1C_E2A9u64;
        for _ in 0..4096 {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            data.push((x >> 24) as u8);
        }
        let mut dst = vec![0u8; data.len() + 16];
        assert_eq!(forward(&data, &mut dst), None);
    }
}
