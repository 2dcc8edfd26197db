//! Adaptive cap controller.
//!
//! Keeps a time-decayed count of capping events and nudges the cap toward the
//! level at which capping happens at the governed daily budget. Too much
//! capping loosens the cap, too little tightens it. All arithmetic saturates;
//! this runs on every recorded observation and never fails.

use serde::{Deserialize, Serialize};

use crate::constants::{CAP_FREQ_MAX, ONE_DAY_PPM, PPM};
use crate::state::{CachedPolicy, ControllerState};
use crate::utils::elapsed;

/// A retune that changed the cap
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapAdjustment {
    pub old_cap: u32,
    pub new_cap: u32,
}

impl CapAdjustment {
    pub fn magnitude(&self) -> u32 {
        self.old_cap.abs_diff(self.new_cap)
    }

    /// Whether the change is large enough to be worth a notification
    pub fn exceeds_dead_band(&self, dead_band_ppm: u32) -> bool {
        let threshold = self.old_cap as u64 * dead_band_ppm as u64;
        self.magnitude() as u64 * PPM > threshold
    }
}

/// Linear decay of the frequency accumulator over `decay_window`
pub fn decay_frequency(cap_freq: u64, elapsed_secs: u32, decay_window: u32) -> u64 {
    if elapsed_secs >= decay_window {
        return 0;
    }
    let remaining = (decay_window - elapsed_secs) as u128;
    (cap_freq as u128 * remaining / decay_window as u128) as u64
}

/// Add one capping event to the accumulator
pub fn bump_frequency(cap_freq: u64) -> u64 {
    cap_freq.saturating_add(ONE_DAY_PPM).min(CAP_FREQ_MAX)
}

/// Retune step: the policy fraction of the current cap, at least one tick
pub fn retune_step(cap: u32, step_ppm: u32) -> u32 {
    let step = cap as u64 * step_ppm as u64 / PPM;
    step.clamp(1, u32::MAX as u64) as u32
}

/// Feed one observation outcome into the controller.
///
/// Returns the cap change if a retune moved the cap.
pub fn on_observation(
    state: &mut ControllerState,
    policy: &CachedPolicy,
    capped: bool,
    now: u32,
) -> Option<CapAdjustment> {
    let since_last = elapsed(state.last_freq_ts, now);
    if since_last == 0 && !capped {
        return None;
    }
    state.last_freq_ts = now;

    if capped {
        state.cap_freq = bump_frequency(state.cap_freq);
    } else {
        state.cap_freq = decay_frequency(state.cap_freq, since_last, policy.decay_window);
    }

    if state.auto_tune_paused {
        return None;
    }
    if elapsed(state.last_cap_update_ts, now) < policy.update_interval {
        return None;
    }

    retune(state, policy, now)
}

fn retune(state: &mut ControllerState, policy: &CachedPolicy, now: u32) -> Option<CapAdjustment> {
    let cap = state.max_ticks_per_block;
    let step = retune_step(cap, policy.step_ppm);

    let new_cap = if state.cap_freq > policy.target_frequency() {
        cap.saturating_add(step).min(policy.max_cap)
    } else {
        cap.saturating_sub(step).max(policy.min_cap)
    };

    if new_cap == cap {
        return None;
    }

    state.max_ticks_per_block = new_cap;
    state.last_cap_update_ts = now;
    Some(CapAdjustment {
        old_cap: cap,
        new_cap,
    })
}
