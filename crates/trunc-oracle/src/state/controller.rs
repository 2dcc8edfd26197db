//! Adaptive cap controller state

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Per-market controller state
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct ControllerState {
    /// Current cap on tick movement per observation
    pub max_ticks_per_block: u32,
    /// Time-decayed capping frequency in ppm-seconds, saturating
    pub cap_freq: u64,
    /// Timestamp of the last frequency update
    pub last_freq_ts: u32,
    /// Timestamp of the last cap change, for retune rate limiting
    pub last_cap_update_ts: u32,
    /// Governance pause of automatic retuning
    pub auto_tune_paused: bool,
}

impl ControllerState {
    pub fn new(max_ticks_per_block: u32, now: u32) -> Self {
        Self {
            max_ticks_per_block,
            cap_freq: 0,
            last_freq_ts: now,
            last_cap_update_ts: now,
            auto_tune_paused: false,
        }
    }
}
