//! # TWAP Query Engine
//!
//! Reads cumulative values at arbitrary points in the retained history.
//!
//! A lookup walks the ring backward in time one segment at a time (see
//! [`ObservationBook::segments_newest_first`]), skipping every segment whose
//! earliest record is still newer than the target, then binary searches the
//! segment that contains it. Targets between two records are interpolated
//! linearly; targets at or after the latest record are extrapolated with the
//! live tick and liquidity.

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};
use crate::state::{Observation, ObservationBook};
use crate::utils::{checked_tick, elapsed, floor_div_i64, lte, mul_div_u128};

/// Cumulative values at one point in time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub tick_cumulative: i64,
    pub seconds_per_liquidity_cumulative_x64: u128,
}

impl From<Observation> for CumulativePoint {
    fn from(observation: Observation) -> Self {
        Self {
            tick_cumulative: observation.tick_cumulative,
            seconds_per_liquidity_cumulative_x64: observation.seconds_per_liquidity_cumulative_x64,
        }
    }
}

/// Result of a multi-offset query, one entry per requested offset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveResult {
    pub tick_cumulatives: Vec<i64>,
    pub seconds_per_liquidity_cumulatives: Vec<u128>,
}

/// Window averages derived from two cumulative points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultResult {
    /// Time-weighted arithmetic mean tick, rounded toward negative infinity
    pub arithmetic_mean_tick: i32,
    /// Time-weighted harmonic mean liquidity
    pub harmonic_mean_liquidity: u128,
}

/// Cumulative values `seconds_ago` before `time`
pub fn observe_single(
    book: &ObservationBook,
    time: u32,
    seconds_ago: u32,
    live_tick: i32,
    live_liquidity: u128,
) -> OracleResult<CumulativePoint> {
    let latest = book.latest()?;

    if seconds_ago == 0 {
        if latest.timestamp != time {
            return Ok(latest.transform(time, live_tick, live_liquidity).into());
        }
        return Ok(latest.into());
    }

    let target = time.wrapping_sub(seconds_ago);

    if lte(time, latest.timestamp, target) {
        if latest.timestamp == target {
            return Ok(latest.into());
        }
        return Ok(latest.transform(target, live_tick, live_liquidity).into());
    }

    let oldest = book.oldest()?;
    if !lte(time, oldest.timestamp, target) {
        return Err(OracleError::TargetTooOld {
            target,
            oldest: oldest.timestamp,
        });
    }

    let (before, after) = bracket(book, time, target)?;

    if before.timestamp == target {
        return Ok(before.into());
    }
    if after.timestamp == target {
        return Ok(after.into());
    }

    let observation_delta = elapsed(before.timestamp, after.timestamp);
    let target_delta = elapsed(before.timestamp, target);

    let tick_rate = after
        .tick_cumulative
        .wrapping_sub(before.tick_cumulative)
        / observation_delta as i64;
    let seconds_per_liquidity_delta = mul_div_u128(
        after
            .seconds_per_liquidity_cumulative_x64
            .wrapping_sub(before.seconds_per_liquidity_cumulative_x64),
        target_delta as u128,
        observation_delta as u128,
    )?;

    Ok(CumulativePoint {
        tick_cumulative: before
            .tick_cumulative
            .wrapping_add(tick_rate.wrapping_mul(target_delta as i64)),
        seconds_per_liquidity_cumulative_x64: before
            .seconds_per_liquidity_cumulative_x64
            .wrapping_add(seconds_per_liquidity_delta),
    })
}

/// Cumulative values for each offset in `seconds_agos`
pub fn observe(
    book: &ObservationBook,
    time: u32,
    seconds_agos: &[u32],
    live_tick: i32,
    live_liquidity: u128,
) -> OracleResult<ObserveResult> {
    let mut result = ObserveResult {
        tick_cumulatives: Vec::with_capacity(seconds_agos.len()),
        seconds_per_liquidity_cumulatives: Vec::with_capacity(seconds_agos.len()),
    };
    for &seconds_ago in seconds_agos {
        let point = observe_single(book, time, seconds_ago, live_tick, live_liquidity)?;
        result.tick_cumulatives.push(point.tick_cumulative);
        result
            .seconds_per_liquidity_cumulatives
            .push(point.seconds_per_liquidity_cumulative_x64);
    }
    Ok(result)
}

/// Mean tick and harmonic mean liquidity over the last `seconds_ago` seconds
pub fn consult(
    book: &ObservationBook,
    time: u32,
    seconds_ago: u32,
    live_tick: i32,
    live_liquidity: u128,
) -> OracleResult<ConsultResult> {
    if seconds_ago == 0 {
        return Err(OracleError::ZeroLookback);
    }

    let start = observe_single(book, time, seconds_ago, live_tick, live_liquidity)?;
    let end = observe_single(book, time, 0, live_tick, live_liquidity)?;

    let tick_delta = end.tick_cumulative.wrapping_sub(start.tick_cumulative);
    let mean_tick = floor_div_i64(tick_delta, seconds_ago as i64);

    let seconds_per_liquidity_delta = end
        .seconds_per_liquidity_cumulative_x64
        .wrapping_sub(start.seconds_per_liquidity_cumulative_x64);
    let harmonic_mean_liquidity =
        ((seconds_ago as u128) << 64) / seconds_per_liquidity_delta.max(1);

    Ok(ConsultResult {
        arithmetic_mean_tick: checked_tick(mean_tick, "arithmetic_mean_tick")?,
        harmonic_mean_liquidity,
    })
}

/// Records on either side of `target`, which must lie strictly inside the
/// retained history.
fn bracket(
    book: &ObservationBook,
    time: u32,
    target: u32,
) -> OracleResult<(Observation, Observation)> {
    // Earliest record of the segment visited just before, i.e. the record
    // that immediately follows the current segment in time
    let mut newer: Option<Observation> = None;

    for segment in book.segments_newest_first() {
        let first = book.at(segment.first);
        if !lte(time, first.timestamp, target) {
            newer = Some(first);
            continue;
        }

        let mut lo = segment.first as u32;
        let mut hi = segment.last as u32;
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if lte(time, book.at(mid as u16).timestamp, target) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        let before = book.at(lo as u16);
        let after = if lo < segment.last as u32 {
            book.at(lo as u16 + 1)
        } else {
            newer.ok_or(OracleError::InvalidSnapshot("observation ring out of order"))?
        };
        return Ok((before, after));
    }

    let oldest = book.oldest()?;
    Err(OracleError::TargetTooOld {
        target,
        oldest: oldest.timestamp,
    })
}
