//! General run-length transform.
//!
//! A pair of equal adjacent bytes signals a run; the bytes that follow carry
//! the remaining run length as a 255-chained sum. Pairs that are not part of
//! a longer run pay one extra byte, so the transform refuses blocks without
//! enough long runs.

use crate::error::Result;

use super::invalid_block;

pub(crate) fn forward(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    let n = src.len();
    if n < 16 {
        return None;
    }
    let mut i = 0;
    let mut out = 0;
    while i < n {
        let b = src[i];
        let mut run = 1usize;
        while i + run < n && src[i + run] == b {
            run += 1;
        }
        if run >= 2 {
            if out + 2 >= n {
                return None;
            }
            dst[out] = b;
            dst[out + 1] = b;
            out += 2;
            let mut rem = run - 2;
            while rem >= 255 {
                if out >= n {
                    return None;
                }
                dst[out] = 255;
                out += 1;
                rem -= 255;
            }
            if out >= n {
                return None;
            }
            dst[out] = rem as u8;
            out += 1;
        } else {
            if out >= n {
                return None;
            }
            dst[out] = b;
            out += 1;
        }
        i += run;
    }
    if out >= n {
        None
    } else {
        Some(out)
    }
}

pub(crate) fn inverse(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let n = src.len();
    let mut i = 0;
    let mut out = 0;
    while i < n {
        let b = src[i];
        if out >= dst.len() {
            return Err(invalid_block("output buffer exhausted"));
        }
        dst[out] = b;
        out += 1;
        i += 1;
        if i < n && src[i] == b {
            if out >= dst.len() {
                return Err(invalid_block("output buffer exhausted"));
            }
            dst[out] = b;
            out += 1;
            i += 1;
            // Chained remainder of the run length.
            let mut total = 0usize;
            loop {
                if i >= n {
                    return Err(invalid_block("truncated run length"));
                }
                let v = src[i];
                i += 1;
                total += v as usize;
                if v != 255 {
                    break;
                }
            }
            if out + total > dst.len() {
                return Err(invalid_block("run exceeds output buffer"));
            }
            dst[out..out + total].fill(b);
            out += total;
        }
    }
    Ok(out)
}
