//! # Oracle Constants
//!
//! - Tick range bounds
//! - Observation paging and cardinality limits
//! - Frequency accumulator units for the cap controller
//! - Default governance parameters

// ============================================================================
// Tick Constants
// ============================================================================

/// Minimum tick (i24-equivalent range)
pub const MIN_TICK: i32 = -887_272;

/// Maximum tick (i24-equivalent range)
pub const MAX_TICK: i32 = 887_272;

/// Largest cap that still fits inside the tick range
pub const MAX_CAP_TICKS: u32 = (MAX_TICK as u32) * 2;

// ============================================================================
// Observation Storage
// ============================================================================

/// Observations held by a single page
pub const PAGE_SIZE: usize = 512;

/// Hard ceiling on `cardinality_next`
pub const MAX_CARDINALITY: u16 = u16::MAX;

/// Fractional bits of `seconds_per_liquidity_cumulative_x64`
pub const SECONDS_PER_LIQUIDITY_FRAC_BITS: u32 = 64;

// ============================================================================
// Controller Units
// ============================================================================

/// Parts-per-million denominator
pub const PPM: u64 = 1_000_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Contribution of a single capping event to the frequency accumulator:
/// one full day of budget at a rate of one event per day.
pub const ONE_DAY_PPM: u64 = SECONDS_PER_DAY * PPM;

/// Saturation sentinel for the frequency accumulator
pub const CAP_FREQ_MAX: u64 = u64::MAX - 1;

// ============================================================================
// Default Governance Parameters
// ============================================================================

pub const DEFAULT_INITIAL_CAP: u32 = 50;
pub const DEFAULT_MIN_CAP: u32 = 1;
pub const DEFAULT_MAX_CAP: u32 = 1_000;

/// 2% of the current cap per retune
pub const DEFAULT_STEP_PPM: u32 = 20_000;

/// One capping event per day
pub const DEFAULT_BUDGET_PPM: u32 = 1_000_000;

pub const DEFAULT_DECAY_WINDOW: u32 = 86_400;
pub const DEFAULT_UPDATE_INTERVAL: u32 = 3_600;

pub const DEFAULT_INITIAL_CARDINALITY: u16 = 1;

/// CapUpdated notifications are suppressed when the change is at most this
/// fraction of the previous cap (0.5%)
pub const DEFAULT_CAP_EVENT_DEAD_BAND_PPM: u32 = 5_000;
