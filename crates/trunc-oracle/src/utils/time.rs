//! 32-bit wrapping timestamp helpers.
//!
//! Observation timestamps are truncated to `u32` and wrap roughly every 136
//! years. Ordering between two stored timestamps is only meaningful relative
//! to a reference `time` that is known to be at or after both of them.

/// Truncate a unix timestamp to the 32-bit observation clock
pub fn block_timestamp(unix_seconds: u64) -> u32 {
    unix_seconds as u32 // truncation is intended
}

/// Seconds elapsed from `earlier` to `later` across a wrap
#[inline]
pub fn elapsed(earlier: u32, later: u32) -> u32 {
    later.wrapping_sub(earlier)
}

/// `a <= b` for timestamps that are both at or before `time`, tolerating one
/// wrap of the 32-bit clock
pub fn lte(time: u32, a: u32, b: u32) -> bool {
    if a <= time && b <= time {
        return a <= b;
    }

    let a_adjusted = if a > time {
        a as u64
    } else {
        a as u64 + (1u64 << 32)
    };
    let b_adjusted = if b > time {
        b as u64
    } else {
        b as u64 + (1u64 << 32)
    };

    a_adjusted <= b_adjusted
}
