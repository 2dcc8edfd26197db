//! # Oracle Math
//!
//! Fixed-point helpers for cumulative accumulators and checked casts for
//! governance-facing values.

use ethnum::U256;

use crate::constants::SECONDS_PER_LIQUIDITY_FRAC_BITS;
use crate::error::{OracleError, OracleResult};

/// `elapsed / max(liquidity, 1)` in Q64.64
pub fn seconds_per_liquidity_x64(elapsed: u32, liquidity: u128) -> u128 {
    ((elapsed as u128) << SECONDS_PER_LIQUIDITY_FRAC_BITS) / liquidity.max(1)
}

/// `a * b / denominator` with a 256-bit intermediate
pub fn mul_div_u128(a: u128, b: u128, denominator: u128) -> OracleResult<u128> {
    if denominator == 0 {
        return Err(OracleError::MathOverflow("mul_div denominator"));
    }
    let result = U256::from(a) * U256::from(b) / U256::from(denominator);
    if result > U256::from(u128::MAX) {
        return Err(OracleError::MathOverflow("mul_div result"));
    }
    Ok(result.as_u128())
}

/// Division rounding toward negative infinity
pub fn floor_div_i64(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    if numerator % denominator != 0 && ((numerator < 0) != (denominator < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

/// Narrow a governance value to `u32`
pub fn checked_u32(value: u64, what: &'static str) -> OracleResult<u32> {
    u32::try_from(value).map_err(|_| OracleError::MathOverflow(what))
}

/// Narrow a wide tick value to `i32`
pub fn checked_tick(value: i64, what: &'static str) -> OracleResult<i32> {
    i32::try_from(value).map_err(|_| OracleError::MathOverflow(what))
}
