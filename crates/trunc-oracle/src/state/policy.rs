//! Cached governance policy.
//!
//! Governance parameters are read from the policy store, validated and frozen
//! into a versioned [`CachedPolicy`] on bootstrap and on every explicit
//! refresh. The record path only ever reads the cached snapshot.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::config::PolicyDefaults;
use crate::constants::{MAX_CAP_TICKS, SECONDS_PER_DAY};
use crate::error::{OracleError, OracleResult};
use crate::interfaces::{MarketId, PolicyStore};
use crate::utils::checked_u32;

/// Keys of the governance policy table
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum PolicyParam {
    /// Cap applied when a market is enabled
    InitialCap,
    MinCap,
    MaxCap,
    /// Maximum fractional cap change per retune
    StepPpm,
    /// Target capping events per day, in ppm
    BudgetPpm,
    /// Seconds over which the frequency accumulator decays to zero
    DecayWindow,
    /// Minimum seconds between retunes
    UpdateInterval,
}

impl PolicyParam {
    pub const ALL: [PolicyParam; 7] = [
        PolicyParam::InitialCap,
        PolicyParam::MinCap,
        PolicyParam::MaxCap,
        PolicyParam::StepPpm,
        PolicyParam::BudgetPpm,
        PolicyParam::DecayWindow,
        PolicyParam::UpdateInterval,
    ];
}

/// Validated snapshot of a market's governance parameters
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct CachedPolicy {
    pub initial_cap: u32,
    pub min_cap: u32,
    pub max_cap: u32,
    pub step_ppm: u32,
    pub budget_ppm: u32,
    pub decay_window: u32,
    pub update_interval: u32,
    /// Incremented on every refresh
    pub version: u64,
}

impl CachedPolicy {
    /// Read every parameter from `store`, falling back to `defaults` for
    /// unset keys, and validate the result.
    pub fn load(
        store: &dyn PolicyStore,
        market: &MarketId,
        defaults: &PolicyDefaults,
        version: u64,
    ) -> OracleResult<Self> {
        let read = |param: PolicyParam, default: u32, what: &'static str| -> OracleResult<u32> {
            match store.get(market, param) {
                Some(value) => checked_u32(value, what),
                None => Ok(default),
            }
        };

        let policy = Self {
            initial_cap: read(PolicyParam::InitialCap, defaults.initial_cap, "initial_cap")?,
            min_cap: read(PolicyParam::MinCap, defaults.min_cap, "min_cap")?,
            max_cap: read(PolicyParam::MaxCap, defaults.max_cap, "max_cap")?,
            step_ppm: read(PolicyParam::StepPpm, defaults.step_ppm, "step_ppm")?,
            budget_ppm: read(PolicyParam::BudgetPpm, defaults.budget_ppm, "budget_ppm")?,
            decay_window: read(PolicyParam::DecayWindow, defaults.decay_window, "decay_window")?,
            update_interval: read(
                PolicyParam::UpdateInterval,
                defaults.update_interval,
                "update_interval",
            )?,
            version,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> OracleResult<()> {
        if self.step_ppm == 0 {
            return Err(OracleError::invalid_policy(PolicyParam::StepPpm, "must be non-zero"));
        }
        if self.min_cap == 0 {
            return Err(OracleError::invalid_policy(PolicyParam::MinCap, "must be non-zero"));
        }
        if self.max_cap < self.min_cap {
            return Err(OracleError::invalid_policy(
                PolicyParam::MaxCap,
                "must be at least min_cap",
            ));
        }
        if self.max_cap > MAX_CAP_TICKS {
            return Err(OracleError::invalid_policy(
                PolicyParam::MaxCap,
                "exceeds the tick range",
            ));
        }
        if self.decay_window == 0 {
            return Err(OracleError::invalid_policy(
                PolicyParam::DecayWindow,
                "must be non-zero",
            ));
        }
        Ok(())
    }

    /// Clamp a cap into `[min_cap, max_cap]`
    pub fn clamp_cap(&self, cap: u32) -> u32 {
        cap.clamp(self.min_cap, self.max_cap)
    }

    /// Frequency accumulator level matching the daily budget
    pub fn target_frequency(&self) -> u64 {
        self.budget_ppm as u64 * SECONDS_PER_DAY
    }
}
