//! Tick-capping guard.
//!
//! A single observation may move the recorded tick by at most `cap` ticks
//! from the previously recorded tick. Moves that reach the cap are clamped to
//! exactly `cap` in the direction of movement and flagged.

/// Outcome of the capping guard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapDecision {
    /// Tick to persist
    pub tick: i32,
    /// Whether the live tick was clamped
    pub capped: bool,
}

/// Clamp `live_tick` to within `cap` ticks of `previous_tick`.
///
/// Both ticks are expected inside the tick range; the clamped tick then lies
/// between them and is in range as well.
pub fn cap_tick(previous_tick: i32, live_tick: i32, cap: u32) -> CapDecision {
    let delta = live_tick as i64 - previous_tick as i64;
    let cap = cap as i64;

    if delta.abs() >= cap {
        let clamped = if delta > 0 {
            previous_tick as i64 + cap
        } else {
            previous_tick as i64 - cap
        };
        CapDecision {
            // |clamped - previous| = cap <= |delta|, so clamped sits between
            // previous and live and fits i32
            tick: clamped as i32,
            capped: true,
        }
    } else {
        CapDecision {
            tick: live_tick,
            capped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_TICK, MIN_TICK};

    #[test]
    fn test_move_beyond_cap_is_clamped() {
        assert_eq!(
            cap_tick(100, 180, 50),
            CapDecision {
                tick: 150,
                capped: true
            }
        );
        assert_eq!(
            cap_tick(100, 20, 50),
            CapDecision {
                tick: 50,
                capped: true
            }
        );
    }

    #[test]
    fn test_move_equal_to_cap_counts_as_capped() {
        let decision = cap_tick(-10, 40, 50);
        assert!(decision.capped);
        assert_eq!(decision.tick, 40);
    }

    #[test]
    fn test_small_move_passes_through() {
        assert_eq!(
            cap_tick(100, 149, 50),
            CapDecision {
                tick: 149,
                capped: false
            }
        );
        assert_eq!(
            cap_tick(100, 100, 50),
            CapDecision {
                tick: 100,
                capped: false
            }
        );
    }

    #[test]
    fn test_full_range_move() {
        let decision = cap_tick(MIN_TICK, MAX_TICK, 1_000);
        assert!(decision.capped);
        assert_eq!(decision.tick, MIN_TICK + 1_000);
    }
}
