//! Verbosity-gated diagnostics.
//!
//! A process-global atomic level gates everything the tool prints to stderr:
//! 0 = silent, 1 = errors, 2 = result summary (default), 3 = configuration,
//! 4 = per-block detail, 5 = debug.

use std::sync::atomic::{AtomicU32, Ordering};

static VERBOSITY: AtomicU32 = AtomicU32::new(2);

/// Current verbosity level.
#[inline]
pub fn verbosity() -> u32 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// Sets the verbosity level.
#[inline]
pub fn set_verbosity(level: u32) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

/// Prints to stderr when the current verbosity is at least `$lvl`.
#[macro_export]
macro_rules! vlog {
    ($lvl:expr, $($arg:tt)*) => {
        if $crate::logging::verbosity() >= $lvl {
            eprintln!($($arg)*);
        }
    };
}
