//! Record an observation for an enabled market

use serde::{Deserialize, Serialize};

use crate::error::OracleResult;
use crate::events::{CapUpdateReason, OracleEvent};
use crate::interfaces::{Identity, MarketId};
use crate::logic::cap_controller;
use crate::logic::{cap_tick, CapAdjustment};
use crate::oracle::{validate_tick, TruncOracle};

/// What a recorded update did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationOutcome {
    pub timestamp: u32,
    /// Tick reported by the market
    pub live_tick: i32,
    /// Tick persisted after capping
    pub recorded_tick: i32,
    pub capped: bool,
    /// Cap in force after the controller ran
    pub max_ticks_per_block: u32,
    pub cap_adjustment: Option<CapAdjustment>,
}

impl TruncOracle {
    /// Record the market's current tick and liquidity.
    ///
    /// The live tick is clamped to within `max_ticks_per_block` of the latest
    /// recorded tick before it is written, and the outcome is fed to the cap
    /// controller.
    pub fn record_observation(
        &self,
        caller: &Identity,
        market: &MarketId,
    ) -> OracleResult<ObservationOutcome> {
        self.ensure_update_source(caller)?;
        let dead_band_ppm = self.config.cap_event_dead_band_ppm;

        self.write_section(market, |state| {
            // Read inside the section so timestamps follow commit order
            let now = self.now();
            let live = self.provider.live_state(market)?;
            validate_tick(live.tick)?;

            let mut state = state.write();
            let previous = state.book.latest()?;
            let cap = state.controller.max_ticks_per_block;
            let decision = cap_tick(previous.tick, live.tick, cap);

            state.book.write(now, decision.tick, live.liquidity)?;
            let policy = state.policy;
            let adjustment =
                cap_controller::on_observation(&mut state.controller, &policy, decision.capped, now);

            let outcome = ObservationOutcome {
                timestamp: now,
                live_tick: live.tick,
                recorded_tick: decision.tick,
                capped: decision.capped,
                max_ticks_per_block: state.controller.max_ticks_per_block,
                cap_adjustment: adjustment,
            };
            drop(state);

            tracing::debug!(
                %market,
                timestamp = now,
                live_tick = live.tick,
                recorded_tick = decision.tick,
                capped = decision.capped,
                "observation recorded"
            );

            let mut events = Vec::new();
            if decision.capped {
                events.push(OracleEvent::TickCapped {
                    market: *market,
                    timestamp: now,
                    live_tick: live.tick,
                    recorded_tick: decision.tick,
                    max_ticks_per_block: cap,
                });
            }
            if let Some(adjustment) = adjustment {
                tracing::debug!(
                    %market,
                    old_cap = adjustment.old_cap,
                    new_cap = adjustment.new_cap,
                    "cap retuned"
                );
                if adjustment.exceeds_dead_band(dead_band_ppm) {
                    events.push(OracleEvent::CapUpdated {
                        market: *market,
                        old_cap: adjustment.old_cap,
                        new_cap: adjustment.new_cap,
                        reason: CapUpdateReason::AutoTune,
                    });
                }
            }

            Ok((outcome, events))
        })
    }
}
